//! Received-share grouping and downloads against a gated service.

mod common;

use common::{drain, service, signed_in, PASSWORD};
use lockerbox_api::{MemoryApi, RemoteApi};
use lockerbox_app::Completion;
use lockerbox_common::RemotePath;

/// Have `owner` share each of `paths` with bob.
async fn share_with_bob(service: &MemoryApi, owner: &str, paths: &[&str]) {
    let client = service.connect();
    client.login(owner, &PASSWORD.into()).await.unwrap();
    for raw in paths {
        let path = RemotePath::parse(raw).unwrap();
        service.put_file(owner, &path, raw.as_bytes()).await;
        client.create_share(&path, "bob").await.unwrap();
    }
}

#[tokio::test]
async fn test_groups_follow_first_seen_order() {
    let service = service().await;
    service.add_user("carol", PASSWORD, "Carol").await;
    share_with_bob(&service, "carol", &["/c1.txt"]).await;
    share_with_bob(&service, "alice", &["/a1.txt", "/docs/a2.txt"]).await;
    share_with_bob(&service, "carol", &["/c2.txt"]).await;

    let (app, _gated, _notices) = signed_in(&service, "bob").await;
    assert!(app.shares().refresh().await.is_applied());

    let groups = app.shares().groups().await;
    assert_eq!(groups.owners().collect::<Vec<_>>(), ["carol", "alice"]);
    assert_eq!(groups.get("carol").unwrap(), ["c1.txt", "c2.txt"]);
    assert_eq!(groups.get("alice").unwrap(), ["a1.txt", "docs/a2.txt"]);
}

#[tokio::test]
async fn test_older_refresh_is_discarded() {
    let service = service().await;
    share_with_bob(&service, "alice", &["/first.txt"]).await;
    let (app, gated, _notices) = signed_in(&service, "bob").await;

    let slow = gated.hold("list_shares");
    let older = {
        let app = app.clone();
        tokio::spawn(async move { app.shares().refresh().await })
    };
    slow.reached().await;

    share_with_bob(&service, "alice", &["/second.txt"]).await;
    assert!(app.shares().refresh().await.is_applied());

    slow.release();
    assert_eq!(older.await.unwrap(), Completion::Discarded);
    assert_eq!(
        app.shares().groups().await.get("alice").unwrap(),
        ["first.txt", "second.txt"]
    );
}

#[tokio::test]
async fn test_download_received_share() {
    let service = service().await;
    share_with_bob(&service, "alice", &["/docs/report.pdf"]).await;
    let (app, _gated, mut notices) = signed_in(&service, "bob").await;

    let download = app
        .shares()
        .download("alice", "docs/report.pdf")
        .await
        .unwrap();
    assert_eq!(download.file_name, "report.pdf");
    assert_eq!(download.content, b"/docs/report.pdf");

    assert!(app.shares().download("alice", "docs/other.pdf").await.is_none());
    assert_eq!(drain(&mut notices).len(), 1);
}

#[tokio::test]
async fn test_owner_manages_recipients_from_navigator() {
    let service = service().await;
    service.add_user("carol", PASSWORD, "Carol").await;
    service
        .put_file("alice", &RemotePath::parse("/plan.md").unwrap(), b"plan")
        .await;
    let (app, _gated, mut notices) = signed_in(&service, "alice").await;
    app.files().refresh().await;

    assert!(app.files().share("plan.md", "bob").await.is_applied());
    assert!(app.files().share("plan.md", "carol").await.is_applied());
    assert_eq!(
        app.files().share_recipients("plan.md").await,
        Some(vec!["bob".to_string(), "carol".to_string()])
    );

    assert!(app.files().unshare("plan.md", Some("bob")).await.is_applied());
    assert_eq!(
        app.files().share_recipients("plan.md").await,
        Some(vec!["carol".to_string()])
    );

    assert!(app.files().share("plan.md", "carol").await.failure().is_some());
    assert_eq!(drain(&mut notices).len(), 1);
}
