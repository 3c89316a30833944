/// HTTP-level tests for the todo API
///
/// Every test drives the real router (middleware included) over a fresh
/// in-memory store.

mod common;

use axum::{body::Body, http::{Request, StatusCode}};
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_healthcheck_reports_database_ok() {
    let ctx = TestContext::new();

    let response = ctx.get("/healthcheck").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "message": "Database connection ok." }));
}

#[tokio::test]
async fn test_healthcheck_reports_unreachable_database_as_501() {
    let ctx = TestContext::new();
    ctx.store.set_online(false);

    let response = ctx.get("/healthcheck").await;

    assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED);
    assert!(!response.message().is_empty());
}

#[tokio::test]
async fn test_internal_errors_have_empty_body() {
    let ctx = TestContext::new();
    ctx.store.set_online(false);

    let response = ctx
        .post("/users", json!({ "username": "ada", "email": "ada@example.com" }))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.raw.is_empty());
}

#[tokio::test]
async fn test_create_and_get_user() {
    let ctx = TestContext::new();

    let created = ctx
        .post("/users", json!({ "username": "ada", "email": "ada@example.com" }))
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let id = created.body["id"].as_i64().unwrap();
    assert_eq!(created.body["username"], "ada");
    assert_eq!(created.body["email"], "ada@example.com");

    let fetched = ctx.get(&format!("/users/{}", id)).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, created.body);
}

#[tokio::test]
async fn test_create_user_requires_both_fields() {
    let ctx = TestContext::new();

    for body in [
        json!({}),
        json!({ "username": "ada" }),
        json!({ "email": "ada@example.com" }),
        json!({ "username": null, "email": "ada@example.com" }),
    ] {
        let response = ctx.post("/users", body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.message(), "Email and username fields are required.");
    }

    assert!(ctx.get("/users").await.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_user_rejects_overlong_fields() {
    let ctx = TestContext::new();

    let response = ctx
        .post(
            "/users",
            json!({ "username": "u".repeat(256), "email": "long@example.com" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Username must be at most 255 characters");
}

#[tokio::test]
async fn test_duplicate_username_or_email_conflicts() {
    let ctx = TestContext::new();
    ctx.create_user("ada").await;

    let same_username = ctx
        .post("/users", json!({ "username": "ada", "email": "other@example.com" }))
        .await;
    assert_eq!(same_username.status, StatusCode::CONFLICT);
    assert_eq!(same_username.message(), "Unique constraint failed: username");

    let same_email = ctx
        .post("/users", json!({ "username": "grace", "email": "ada@example.com" }))
        .await;
    assert_eq!(same_email.status, StatusCode::CONFLICT);
    assert_eq!(same_email.message(), "Unique constraint failed: email");
}

#[tokio::test]
async fn test_list_users_in_id_order() {
    let ctx = TestContext::new();
    let first = ctx.create_user("ada").await;
    let second = ctx.create_user("grace").await;

    let response = ctx.get("/users").await;

    assert_eq!(response.status, StatusCode::OK);
    let ids: Vec<i64> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn test_user_routes_reject_non_integer_ids() {
    let ctx = TestContext::new();

    let response = ctx.get("/users/abc").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "User id must be a valid integer, got: 'abc'");

    assert_eq!(ctx.delete("/users/1.5").await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_undecodable_path_ids_get_json_errors() {
    let ctx = TestContext::new();

    let user = ctx.get("/users/%FF").await;
    assert_eq!(user.status, StatusCode::BAD_REQUEST);
    assert_eq!(user.message(), "User id must be a valid integer, got: '%FF'");

    let list = ctx.delete("/todo-lists/%FF").await;
    assert_eq!(list.status, StatusCode::NOT_FOUND);
    assert_eq!(list.message(), "Todo list id must be a valid int");

    let todo = ctx.delete("/todo-lists/1/todos/%FF").await;
    assert_eq!(todo.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        todo.message(),
        "The path todo id must be a valid number, got: '%FF'"
    );

    let patch = ctx
        .patch("/todo-lists/%FF/todos/1", json!({ "completed": true }))
        .await;
    assert_eq!(patch.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        patch.message(),
        "The path todo list id must be a valid number, got: '%FF'"
    );
}

#[tokio::test]
async fn test_deleted_user_is_gone() {
    let ctx = TestContext::new();
    let id = ctx.create_user("ada").await;

    let deleted = ctx.delete(&format!("/users/{}", id)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body, json!({ "id": id }));

    let fetched = ctx.get(&format!("/users/{}", id)).await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);
    assert_eq!(fetched.message(), "User not found");

    assert_eq!(
        ctx.delete(&format!("/users/{}", id)).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_user_owning_lists_cannot_be_deleted() {
    let ctx = TestContext::new();
    let user = ctx.create_user("ada").await;
    ctx.create_list(user, "groceries").await;

    let response = ctx.delete(&format!("/users/{}", user)).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(ctx.get(&format!("/users/{}", user)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_todo_list_accepts_string_owner_id() {
    let ctx = TestContext::new();
    let user = ctx.create_user("ada").await;

    let response = ctx
        .post(
            "/todo-lists",
            json!({ "ownerId": user.to_string(), "name": "groceries" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["ownerId"], user);
    assert_eq!(response.body["name"], "groceries");
}

#[tokio::test]
async fn test_create_todo_list_validation() {
    let ctx = TestContext::new();
    let user = ctx.create_user("ada").await;

    let missing = ctx.post("/todo-lists", json!({ "ownerId": user })).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.message(), "Owner and name fields are required");

    let not_integer = ctx
        .post("/todo-lists", json!({ "ownerId": "abc", "name": "groceries" }))
        .await;
    assert_eq!(not_integer.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_integer.message(), "Owner field must be a valid integer");

    let unknown_owner = ctx
        .post("/todo-lists", json!({ "ownerId": 999999, "name": "groceries" }))
        .await;
    assert_eq!(unknown_owner.status, StatusCode::BAD_REQUEST);
    assert!(unknown_owner
        .message()
        .starts_with("User id 999999 is a non-existent user id."));
}

#[tokio::test]
async fn test_list_for_deleted_owner_is_rejected() {
    let ctx = TestContext::new();
    let user = ctx.create_user("ada").await;
    assert_eq!(
        ctx.delete(&format!("/users/{}", user)).await.status,
        StatusCode::OK
    );

    let response = ctx
        .post("/todo-lists", json!({ "ownerId": user, "name": "groceries" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_todo_list_includes_todos_without_list_id() {
    let ctx = TestContext::new();
    let user = ctx.create_user("ada").await;
    let list = ctx.create_list(user, "groceries").await;
    let todo = ctx.create_todo(list, "buy milk").await;

    let response = ctx.get(&format!("/todo-lists/{}", list)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "id": list,
            "ownerId": user,
            "name": "groceries",
            "todos": [{ "id": todo, "description": "buy milk", "completed": false }],
        })
    );
}

#[tokio::test]
async fn test_todo_list_routes_treat_bad_ids_as_not_found() {
    let ctx = TestContext::new();

    let response = ctx.get("/todo-lists/abc").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "Todo list id must be a valid int");

    assert_eq!(ctx.delete("/todo-lists/abc").await.status, StatusCode::NOT_FOUND);
    assert_eq!(ctx.get("/todo-lists/12345").await.status, StatusCode::NOT_FOUND);
    assert_eq!(ctx.delete("/todo-lists/12345").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_with_todos_cannot_be_deleted() {
    let ctx = TestContext::new();
    let user = ctx.create_user("ada").await;
    let list = ctx.create_list(user, "groceries").await;
    let todo = ctx.create_todo(list, "buy milk").await;

    let blocked = ctx.delete(&format!("/todo-lists/{}", list)).await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);

    assert_eq!(
        ctx.delete(&format!("/todo-lists/{}/todos/{}", list, todo)).await.status,
        StatusCode::OK
    );

    let deleted = ctx.delete(&format!("/todo-lists/{}", list)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body, json!({ "id": list }));
}

#[tokio::test]
async fn test_create_todo_defaults_and_flag_parsing() {
    let ctx = TestContext::new();
    let user = ctx.create_user("ada").await;
    let list = ctx.create_list(user, "groceries").await;
    let uri = format!("/todo-lists/{}/todos", list);

    let plain = ctx.post(&uri, json!({ "description": "milk" })).await;
    assert_eq!(plain.status, StatusCode::OK);
    assert_eq!(plain.body["completed"], false);
    assert_eq!(plain.body["listId"], list);

    let text_flag = ctx
        .post(&uri, json!({ "description": "eggs", "completed": "TRUE" }))
        .await;
    assert_eq!(text_flag.status, StatusCode::OK);
    assert_eq!(text_flag.body["completed"], true);

    let null_flag = ctx
        .post(&uri, json!({ "description": "bread", "completed": null }))
        .await;
    assert_eq!(null_flag.status, StatusCode::OK);
    assert_eq!(null_flag.body["completed"], false);

    let bad_flag = ctx
        .post(&uri, json!({ "description": "jam", "completed": "yes" }))
        .await;
    assert_eq!(bad_flag.status, StatusCode::BAD_REQUEST);

    let listed = ctx.get(&uri).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_create_todo_validation() {
    let ctx = TestContext::new();

    let missing = ctx.post("/todo-lists/abc/todos", json!({})).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.message(), "Description field is required");

    let bad_id = ctx
        .post("/todo-lists/abc/todos", json!({ "description": "milk" }))
        .await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        bad_id.message(),
        "The path todo list id must be a valid number, got: 'abc'"
    );

    let unknown_list = ctx
        .post("/todo-lists/999999/todos", json!({ "description": "milk" }))
        .await;
    assert_eq!(unknown_list.status, StatusCode::BAD_REQUEST);

    let too_long = ctx
        .post(
            "/todo-lists/1/todos",
            json!({ "description": "d".repeat(1025) }),
        )
        .await;
    assert_eq!(too_long.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_todos_of_missing_list() {
    let ctx = TestContext::new();

    assert_eq!(ctx.get("/todo-lists/42/todos").await.status, StatusCode::NOT_FOUND);
    assert_eq!(ctx.get("/todo-lists/x/todos").await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_requires_a_field_regardless_of_ids() {
    let ctx = TestContext::new();

    for uri in ["/todo-lists/abc/todos/xyz", "/todo-lists/1/todos/1"] {
        let response = ctx.patch(uri, json!({})).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.message(),
            "Either description or completed fields must be specified"
        );
    }

    let null_only = ctx
        .patch("/todo-lists/1/todos/1", json!({ "completed": null }))
        .await;
    assert_eq!(null_only.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_rejects_bad_path_ids() {
    let ctx = TestContext::new();

    let bad_list = ctx
        .patch("/todo-lists/abc/todos/1", json!({ "completed": true }))
        .await;
    assert_eq!(bad_list.status, StatusCode::BAD_REQUEST);

    let bad_todo = ctx
        .patch("/todo-lists/1/todos/xyz", json!({ "completed": true }))
        .await;
    assert_eq!(bad_todo.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        bad_todo.message(),
        "The path todo id must be a valid number, got: 'xyz'"
    );
}

#[tokio::test]
async fn test_todo_is_only_reachable_through_its_own_list() {
    let ctx = TestContext::new();
    let user = ctx.create_user("ada").await;
    let home = ctx.create_list(user, "home").await;
    let work = ctx.create_list(user, "work").await;
    let todo = ctx.create_todo(home, "laundry").await;

    let wrong_get = ctx.get(&format!("/todo-lists/{}/todos/{}", work, todo)).await;
    assert_eq!(wrong_get.status, StatusCode::NOT_FOUND);

    let wrong_patch = ctx
        .patch(
            &format!("/todo-lists/{}/todos/{}", work, todo),
            json!({ "completed": true }),
        )
        .await;
    assert_eq!(wrong_patch.status, StatusCode::BAD_REQUEST);

    let wrong_delete = ctx
        .delete(&format!("/todo-lists/{}/todos/{}", work, todo))
        .await;
    assert_eq!(wrong_delete.status, StatusCode::NOT_FOUND);

    let untouched = ctx.get(&format!("/todo-lists/{}/todos/{}", home, todo)).await;
    assert_eq!(untouched.status, StatusCode::OK);
    assert_eq!(untouched.body["completed"], false);
}

#[tokio::test]
async fn test_delete_missing_todo_is_not_found() {
    let ctx = TestContext::new();

    let response = ctx.delete("/todo-lists/1/todos/999999").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "Todo not found");
}

#[tokio::test]
async fn test_complete_a_todo() {
    let ctx = TestContext::new();
    let user = ctx.create_user("ada").await;
    let list = ctx.create_list(user, "groceries").await;
    let todo = ctx.create_todo(list, "buy milk").await;
    let uri = format!("/todo-lists/{}/todos/{}", list, todo);

    let patched = ctx.patch(&uri, json!({ "completed": true })).await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["completed"], true);
    assert_eq!(patched.body["description"], "buy milk");

    let fetched = ctx.get(&uri).await;
    assert_eq!(
        fetched.body,
        json!({ "id": todo, "listId": list, "description": "buy milk", "completed": true })
    );

    let renamed = ctx
        .patch(&uri, json!({ "description": "buy oat milk", "completed": "false" }))
        .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["description"], "buy oat milk");
    assert_eq!(renamed.body["completed"], false);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();

    let request = Request::builder()
        .method("POST")
        .uri("/users")
        .header("content-type", "application/json")
        .body(Body::from("{\"username\": "))
        .unwrap();
    let response = ctx.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(!response.message().is_empty());

    let no_body = ctx.request("POST", "/users", None).await;
    assert_eq!(no_body.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::new();

    let response = ctx.get("/projects").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "Route not found");
}
