//! End-to-end coverage of [`ServiceBridge`] against real HTTP servers.
//!
//! The colocated unit tests in `src/services/` drive each router in-process
//! via `tower::ServiceExt::oneshot`; they never exercise a real socket, so a
//! serialization mismatch between [`ServiceBridge`]'s request/response types
//! and what `axum::serve` actually puts on the wire would not be caught
//! there. These tests bind each reference service to an ephemeral port with
//! `axum::serve` and talk to it through a genuine [`ServiceBridge`].

use agor::bridge::{CreateTaskRequest, SearchRequest, ServiceBridge, StoreKnowledgeRequest, UpdateTaskRequest};
use agor::bridge::config::BridgeConfig;
use agor::services::{coordination, knowledge, vector};
use test_log::test;
use tokio::net::TcpListener;

async fn spawn(router: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener has a local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server task");
    });
    format!("http://{addr}")
}

async fn bridge() -> ServiceBridge {
    let knowledge_url = spawn(knowledge::router()).await;
    let vector_url = spawn(vector::router()).await;
    let coordination_url = spawn(coordination::router()).await;
    ServiceBridge::new(BridgeConfig::testing(knowledge_url, vector_url, coordination_url))
}

#[test(tokio::test)]
async fn test_stores_and_finds_a_knowledge_item_by_substring() {
    let bridge = bridge().await;

    bridge
        .store_knowledge(&StoreKnowledgeRequest {
            content: "rust ownership rules".to_string(),
            metadata: None,
        })
        .await
        .expect("store succeeds");
    bridge
        .store_knowledge(&StoreKnowledgeRequest {
            content: "unrelated entry".to_string(),
            metadata: None,
        })
        .await
        .expect("store succeeds");

    let results = bridge
        .search_knowledge(&SearchRequest {
            query: "ownership".to_string(),
            limit: None,
            filters: None,
        })
        .await
        .expect("search succeeds");

    assert_eq!(results.results.len(), 1);
    assert_eq!(results.results[0].content, "rust ownership rules");

    let listed = bridge.list_knowledge(None).await.expect("list succeeds");
    assert_eq!(listed.len(), 2);
}

#[test(tokio::test)]
async fn test_search_knowledge_rejects_empty_query() {
    let bridge = bridge().await;

    let err = bridge
        .search_knowledge(&SearchRequest {
            query: "   ".to_string(),
            limit: None,
            filters: None,
        })
        .await
        .expect_err("blank query is rejected");

    assert!(format!("{err}").contains("400") || format!("{err}").contains("query"));
}

#[test(tokio::test)]
async fn test_ranks_title_hit_above_content_only_hit_over_http() {
    let bridge = bridge().await;

    bridge
        .store_document(&StoreKnowledgeRequest {
            content: "nothing relevant here".to_string(),
            metadata: Some(serde_json::json!({ "title": "Rust guide" })),
        })
        .await
        .expect("store succeeds");
    bridge
        .store_document(&StoreKnowledgeRequest {
            content: "a short note about rust".to_string(),
            metadata: Some(serde_json::json!({ "title": "other" })),
        })
        .await
        .expect("store succeeds");

    let results = bridge
        .search_documents(&SearchRequest {
            query: "rust".to_string(),
            limit: None,
            filters: None,
        })
        .await
        .expect("search succeeds");

    assert_eq!(results.results.len(), 2);
    assert_eq!(results.results[0].metadata.as_ref().and_then(|m| m.get("title")).and_then(|t| t.as_str()), Some("Rust guide"));
}

#[test(tokio::test)]
async fn test_hub_task_note_history_accumulates_across_http_updates() {
    let bridge = bridge().await;

    let created = bridge
        .create_task(&CreateTaskRequest {
            title: "write spec".to_string(),
            description: "draft the initial specification".to_string(),
            assigned_to: None,
            priority: Some("high".to_string()),
            r#type: Some("specification".to_string()),
        })
        .await
        .expect("create succeeds");

    let updated = bridge
        .update_hub_task(
            &created.task_id,
            &UpdateTaskRequest {
                status: "executing".to_string(),
                data: Some(serde_json::json!({ "progress": 0.5 })),
            },
        )
        .await
        .expect("update succeeds");
    assert_eq!(updated.status, "executing");
    assert_eq!(updated.notes.len(), 2);

    let completed = bridge
        .complete_hub_task(&created.task_id, Some(serde_json::json!({ "artifact": "spec.md" })))
        .await
        .expect("complete succeeds");
    assert_eq!(completed.status, "completed");
    assert_eq!(completed.notes.len(), 3);
    assert_eq!(completed.notes[0].status, "pending");
    assert_eq!(completed.notes[1].status, "executing");
    assert_eq!(completed.notes[2].status, "completed");

    let listed = bridge
        .list_hub_tasks(Some("completed"), None, None)
        .await
        .expect("list succeeds");
    assert_eq!(listed.tasks.len(), 1);
    assert_eq!(listed.tasks[0].task_id, created.task_id);
}

#[test(tokio::test)]
async fn test_hub_update_on_unknown_task_surfaces_as_service_error() {
    let bridge = bridge().await;

    let err = bridge
        .update_hub_task(
            "no-such-task",
            &UpdateTaskRequest {
                status: "executing".to_string(),
                data: None,
            },
        )
        .await
        .expect_err("unknown task id fails");

    assert!(format!("{err}").contains("404") || format!("{err}").contains("no such task"));
}

#[test(tokio::test)]
async fn test_health_reports_each_services_own_name() {
    let bridge = bridge().await;

    let knowledge = bridge.health("knowledge").await.expect("knowledge health succeeds");
    assert_eq!(knowledge.status, "healthy");
    assert_eq!(knowledge.service.as_deref(), Some("knowledge"));

    let vector = bridge.health("vector").await.expect("vector health succeeds");
    assert_eq!(vector.service.as_deref(), Some("vector"));

    let coordination = bridge.health("coordination").await.expect("coordination health succeeds");
    assert_eq!(coordination.service.as_deref(), Some("coordination"));
}
