//! Canned push payloads, used to exercise the whole pipeline without a real forge.

use serde_json::{json, Value};

use crate::webhooks::payload::now;

pub fn gogs_push() -> Value {
    json!({
        "ref": "refs/heads/master",
        "before": "0000000000000000000000000000000000000000",
        "after": "1234567890abcdef1234567890abcdef12345678",
        "compare_url": "http://gogs.example.com/testuser/test-repo/compare/master",
        "commits": [{
            "id": "1234567890abcdef1234567890abcdef12345678",
            "message": "test: add a new feature module",
            "url": "http://gogs.example.com/testuser/test-repo/commit/1234567890abcdef1234567890abcdef12345678",
            "author": { "name": "Test User", "email": "test@example.com" },
            "timestamp": now()
        }],
        "repository": {
            "id": 123,
            "name": "test-repo",
            "full_name": "testuser/test-repo",
            "html_url": "http://gogs.example.com/testuser/test-repo",
            "description": "sample repository",
            "private": false,
            "default_branch": "master"
        },
        "pusher": { "name": "Test User", "email": "test@example.com", "username": "testuser" }
    })
}

pub fn github_push() -> Value {
    let commit = json!({
        "id": "1234567890abcdef1234567890abcdef12345678",
        "tree_id": "abcdef1234567890abcdef1234567890abcdef12",
        "distinct": true,
        "message": "test: add GitHub webhook support",
        "timestamp": now(),
        "url": "https://github.com/testuser/test-repo/commit/1234567890abcdef1234567890abcdef12345678",
        "author": { "name": "Test User", "email": "test@example.com", "username": "testuser" },
        "committer": { "name": "Test User", "email": "test@example.com", "username": "testuser" },
        "added": ["src/github.rs"],
        "removed": [],
        "modified": ["README.md"]
    });

    json!({
        "ref": "refs/heads/main",
        "before": "0000000000000000000000000000000000000000",
        "after": "1234567890abcdef1234567890abcdef12345678",
        "created": false,
        "deleted": false,
        "forced": false,
        "base_ref": null,
        "compare": "https://github.com/testuser/test-repo/compare/main...1234567",
        "commits": [commit.clone()],
        "head_commit": commit,
        "repository": {
            "id": 123456789,
            "name": "test-repo",
            "full_name": "testuser/test-repo",
            "private": false,
            "html_url": "https://github.com/testuser/test-repo",
            "clone_url": "https://github.com/testuser/test-repo.git",
            "default_branch": "main"
        },
        "pusher": { "name": "testuser", "email": "test@example.com" },
        "sender": { "login": "testuser", "id": 12345, "type": "User" }
    })
}
