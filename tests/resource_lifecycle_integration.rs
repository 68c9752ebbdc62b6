use crate::test_utils::shared::{
    payload, request_body, setup_client, stored_post, unreachable_client, Post, PostFields,
    CREATED_AT, UPDATED_AT,
};
use parse_resource::{
    parse_model, Callback, Hooks, ParseError, ParseModel, Resource, ResourceError, ResourceState,
    Validatable,
};
use serde_json::json;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};


fn record(resource: &mut Resource<Audited>, step: &str) {
    let mut trail: Vec<String> = resource.get("trail").unwrap_or_default();
    trail.push(step.to_string());
    let _ = resource.set("trail", trail);
}

fn audited_hooks() -> Hooks<Audited> {
    Hooks::new()
        .on(Callback::BeforeSave, |r| record(r, "before_save"))
        .on(Callback::BeforeCreate, |r| record(r, "before_create"))
        .on(Callback::AfterCreate, |r| record(r, "after_create"))
        .on(Callback::BeforeUpdate, |r| record(r, "before_update"))
        .on(Callback::AfterUpdate, |r| record(r, "after_update"))
        .on(Callback::AfterSave, |r| record(r, "after_save"))
}

parse_model! {
    pub struct Audited("Audited", hooks = audited_hooks) {
        note: String,
    }
}

impl Validatable for Audited {}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_id_and_merges_attributes() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("POST"))
            .and(path("/1/classes/Post"))
            .and(header("X-Parse-Application-Id", "test-app"))
            .and(header("X-Parse-Master-Key", "test-master"))
            .and(body_json(json!({"title": "A"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"objectId": "xyz", "createdAt": CREATED_AT})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut post = Resource::<Post>::new();
        post.set_title("A").unwrap();
        let result = post.save(&client).await;

        assert!(result.is_ok(), "save failed: {:?}", result.err());
        assert_eq!(post.id(), Some("xyz"));
        assert_eq!(post.title().as_deref(), Some("A"));
        assert_eq!(post.state(), ResourceState::Persisted);
        assert_eq!(post.created_at().map(|d| d.iso()), Some(CREATED_AT));
        assert!(!post.is_dirty());
        assert_eq!(post.persisted_attributes().get("title"), Some(&json!("A")));
        assert!(post.errors().is_empty());
    }

    #[tokio::test]
    async fn test_class_level_create_saves_attributes() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("POST"))
            .and(path("/1/classes/Post"))
            .and(body_json(json!({"title": "Hello", "author": "B"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"objectId": "p1", "createdAt": CREATED_AT})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let post = Post::create(&client, json!({"title": "Hello", "author": "B"}))
            .await
            .expect("create should succeed");
        assert_eq!(post.id(), Some("p1"));
        assert_eq!(post.author().as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_class_level_create_with_bad_attributes_is_a_validation_error() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(any())
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let error = Post::create(&client, json!({"title": "A", "objectId": "forged"}))
            .await
            .unwrap_err();
        assert!(error.is_validation());
        assert_eq!(
            error.validation_errors().unwrap().on("objectId"),
            vec!["is assigned by the server"]
        );

        let error = Post::create(&client, json!(["not", "an", "object"]))
            .await
            .unwrap_err();
        assert!(error.is_validation());
        assert_eq!(error.validation_errors().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_rejection_keeps_object_new() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("POST"))
            .and(path("/1/classes/Post"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"code": 137, "error": "duplicate value for title"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut post = Resource::<Post>::new();
        post.set_title("A").unwrap();
        let error = post.save(&client).await.unwrap_err();

        match &error {
            ResourceError::RemoteRejection {
                status,
                code,
                message,
                error,
            } => {
                assert_eq!(*status, 400);
                assert_eq!(*code, 137);
                assert_eq!(message, "duplicate value for title");
                assert!(error.is_base());
            }
            other => panic!("expected RemoteRejection, got {:?}", other),
        }
        assert!(post.is_new());
        assert_eq!(post.id(), None);
        assert_eq!(post.errors().len(), 1);
        assert!(post.is_dirty(), "pending changes survive a rejected save");
    }

    #[tokio::test]
    async fn test_validation_failure_sends_no_request() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut post = Resource::<Post>::new();
        post.set_author("B").unwrap();
        let error = post.save(&client).await.unwrap_err();

        assert!(error.is_validation());
        let errors = error.validation_errors().unwrap();
        assert_eq!(errors.on("title"), vec!["can't be blank"]);
        assert_eq!(post.errors().full_messages(), vec!["title can't be blank"]);
        assert!(post.is_new());
    }

    #[tokio::test]
    async fn test_saving_twice_issues_two_updates() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("POST"))
            .and(path("/1/classes/Post"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"objectId": "xyz", "createdAt": CREATED_AT})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/1/classes/Post/xyz"))
            .and(body_json(json!({"title": "B"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updatedAt": UPDATED_AT})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/1/classes/Post/xyz"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updatedAt": UPDATED_AT})))
            .expect(1)
            .mount(&server)
            .await;

        let mut post = Resource::<Post>::new();
        post.set_title("A").unwrap();
        post.save(&client).await.expect("create");

        post.set_title("B").unwrap();
        post.save(&client).await.expect("first update");
        assert_eq!(post.title().as_deref(), Some("B"));
        assert_eq!(post.updated_at().map(|d| d.iso()), Some(UPDATED_AT));

        post.save(&client).await.expect("second update");
        assert_eq!(post.id(), Some("xyz"));
        assert!(post.is_persisted());
    }

    #[tokio::test]
    async fn test_field_operations_resolve_against_the_response() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("PUT"))
            .and(path("/1/classes/Post/p1"))
            .and(body_json(json!({
                "views": {"__op": "Increment", "amount": 5},
                "author": {"__op": "Delete"},
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"updatedAt": UPDATED_AT, "views": 6})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut post = stored_post("p1", "Title");
        post.increment("views", 5).unwrap().unset("author").unwrap();
        post.update(&client).await.expect("update should succeed");

        assert_eq!(post.views(), Some(6));
        assert_eq!(post.author(), None);
        assert_eq!(post.title().as_deref(), Some("Title"));
        assert!(!post.is_dirty());
    }

    #[tokio::test]
    async fn test_create_response_without_object_id_is_an_error() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("POST"))
            .and(path("/1/classes/Post"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"createdAt": CREATED_AT})))
            .mount(&server)
            .await;

        let mut post = Resource::<Post>::new();
        post.set_title("A").unwrap();
        let error = post.save(&client).await.unwrap_err();

        assert!(matches!(
            error,
            ResourceError::Transport(ParseError::UnexpectedResponse(_))
        ));
        assert!(post.is_new());
    }

    #[tokio::test]
    async fn test_create_response_without_created_at_is_an_error() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("POST"))
            .and(path("/1/classes/Post"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"objectId": "xyz"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut post = Resource::<Post>::new();
        post.set_title("A").unwrap();
        let error = post.save(&client).await.unwrap_err();

        assert!(matches!(
            error,
            ResourceError::Transport(ParseError::UnexpectedResponse(_))
        ));
        assert!(post.is_new());
        assert!(post.created_at().is_none());
    }

    #[tokio::test]
    async fn test_rejected_update_keeps_object_persisted() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("PUT"))
            .and(path("/1/classes/Post/p1"))
            .and(body_json(json!({"views": "many"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 111,
                "error": "schema mismatch for Post.views; expected Number but got String"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut post = stored_post("p1", "Title");
        post.set("views", "many").unwrap();
        let error = post.save(&client).await.unwrap_err();

        match &error {
            ResourceError::RemoteRejection { status, code, .. } => {
                assert_eq!(*status, 400);
                assert_eq!(*code, 111);
            }
            other => panic!("expected RemoteRejection, got {:?}", other),
        }
        assert_eq!(post.state(), ResourceState::Persisted);
        assert_eq!(post.id(), Some("p1"));
        assert_eq!(post.persisted_attributes().get("title"), Some(&json!("Title")));
        assert!(post.persisted_attributes().get("views").is_none());
        assert_eq!(post.pending_attributes().get("views"), Some(&json!("many")));
        assert_eq!(
            post.errors().full_messages(),
            vec!["Field set to incorrect type".to_string()]
        );
        assert_eq!(post.updated_at().map(|d| d.iso()), Some(CREATED_AT));
    }

    #[tokio::test]
    async fn test_unsetting_required_field_fails_before_any_request() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut post = stored_post("p1", "Title");
        post.unset("title").unwrap();
        let error = post.save(&client).await.unwrap_err();

        assert!(error.is_validation());
        assert_eq!(post.errors().on("title"), vec!["can't be blank"]);
        assert!(post.is_persisted());
    }

    #[tokio::test]
    async fn test_server_error_on_create_is_a_transport_failure() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("POST"))
            .and(path("/1/classes/Post"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let mut post = Resource::<Post>::new();
        post.set_title("A").unwrap();
        let error = post.save(&client).await.unwrap_err();

        assert!(matches!(
            error,
            ResourceError::Transport(ParseError::InternalServerError(_))
        ));
        assert!(post.is_new());
        assert!(post.errors().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_transport_failure() {
        let client = unreachable_client();

        let mut post = Resource::<Post>::new();
        post.set_title("A").unwrap();
        let error = post.save(&client).await.unwrap_err();

        assert!(matches!(
            error,
            ResourceError::Transport(ParseError::ReqwestError(_))
        ));
        assert!(post.is_new());
        assert_eq!(post.pending_attributes().get("title"), Some(&json!("A")));
    }

    #[tokio::test]
    async fn test_create_on_persisted_object_is_invalid_state() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut post = stored_post("p1", "Title");
        let error = post.create(&client).await.unwrap_err();
        assert!(matches!(
            error,
            ResourceError::InvalidState {
                operation: "create",
                state: ResourceState::Persisted
            }
        ));

        let mut fresh = Resource::<Post>::new();
        let error = fresh.update(&client).await.unwrap_err();
        assert!(matches!(
            error,
            ResourceError::InvalidState {
                operation: "update",
                state: ResourceState::New
            }
        ));
    }

    #[tokio::test]
    async fn test_destroy_clears_local_state() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("DELETE"))
            .and(path("/1/classes/Post/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let mut post = stored_post("p1", "Title");
        post.destroy(&client).await.expect("destroy should succeed");

        assert_eq!(post.state(), ResourceState::Destroyed);
        assert_eq!(post.id(), None);
        assert_eq!(post.created_at(), None);
        assert!(post.attributes().is_empty());
        assert!(post.to_pointer().is_none());
    }

    #[tokio::test]
    async fn test_destroy_failure_still_clears_local_state() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("DELETE"))
            .and(path("/1/classes/Post/p1"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"code": 1, "error": "boom"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut post = stored_post("p1", "Title");
        let error = post.destroy(&client).await.unwrap_err();

        assert!(error.is_transport());
        assert!(post.is_destroyed());
        assert_eq!(post.id(), None);
        assert!(post.attributes().is_empty());
    }

    #[tokio::test]
    async fn test_destroyed_objects_refuse_further_operations() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("DELETE"))
            .and(path("/1/classes/Post/p1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut post = stored_post("p1", "Title");
        post.destroy(&client).await.expect("destroy should succeed");

        post.set_title("again").unwrap();
        for error in [
            post.save(&client).await.unwrap_err(),
            post.create(&client).await.unwrap_err(),
            post.update(&client).await.unwrap_err(),
            post.destroy(&client).await.unwrap_err(),
        ] {
            assert!(
                matches!(
                    error,
                    ResourceError::InvalidState {
                        state: ResourceState::Destroyed,
                        ..
                    }
                ),
                "unexpected error: {:?}",
                error
            );
        }
    }

    #[tokio::test]
    async fn test_destroy_on_new_object_is_invalid_state() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut post = Resource::<Post>::new();
        post.set_title("never saved").unwrap();
        let error = post.destroy(&client).await.unwrap_err();

        assert!(matches!(
            error,
            ResourceError::InvalidState {
                operation: "destroy",
                state: ResourceState::New
            }
        ));
        assert!(post.is_new());
        assert_eq!(post.title().as_deref(), Some("never saved"));
    }

    #[tokio::test]
    async fn test_hooks_run_around_create_and_update() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("POST"))
            .and(path("/1/classes/Audited"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"objectId": "a1", "createdAt": CREATED_AT})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/1/classes/Audited/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updatedAt": UPDATED_AT})))
            .expect(1)
            .mount(&server)
            .await;

        let mut audited = Resource::<Audited>::new();
        audited.save(&client).await.expect("create should succeed");

        // before hooks ran ahead of the POST, so their writes were sent
        assert_eq!(
            request_body(&server, 0).await,
            json!({"trail": ["before_save", "before_create"]})
        );
        assert_eq!(
            audited.get::<Vec<String>>("trail").unwrap(),
            vec!["before_save", "before_create", "after_create", "after_save"]
        );

        audited.save(&client).await.expect("update should succeed");
        assert_eq!(
            audited.get::<Vec<String>>("trail").unwrap(),
            vec![
                "before_save",
                "before_create",
                "after_create",
                "after_save",
                "before_save",
                "before_update",
                "after_update",
                "after_save",
            ]
        );
    }

    #[tokio::test]
    async fn test_after_hooks_do_not_run_on_failure() {
        let server = MockServer::start().await;
        let client = setup_client(&server);

        Mock::given(method("POST"))
            .and(path("/1/classes/Audited"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"code": 142, "error": "nope"})),
            )
            .mount(&server)
            .await;

        let mut audited = Resource::<Audited>::new();
        assert!(audited.save(&client).await.is_err());
        assert_eq!(
            audited.get::<Vec<String>>("trail").unwrap(),
            vec!["before_save", "before_create"]
        );
    }

    #[tokio::test]
    async fn test_stored_object_points_to_itself() {
        let post = Resource::<Post>::from_remote(payload(json!({
            "objectId": "p1",
            "createdAt": CREATED_AT,
            "title": "T",
        })))
        .unwrap();
        let pointer = post.to_pointer().unwrap();
        assert_eq!(pointer.class_name, "Post");
        assert_eq!(pointer.object_id, "p1");
    }
}
