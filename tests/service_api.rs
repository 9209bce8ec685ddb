//! Wiremock-driven tests for the service façade: URL assembly, query
//! whitelisting, auth, and response guarding.
use connections_blogs::{BlogsConfig, BlogsService, PostDraft, PostQuery, ServiceError};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = include_str!("fixtures/blog_feed.xml");
const POST: &str = include_str!("fixtures/blog_post.xml");
const ATOM: &str = "application/atom+xml";

fn service_for(server: &MockServer) -> BlogsService {
    let config = BlogsConfig {
        base_url: format!("{}/blogs", server.uri()),
        username: Some("ada".to_string()),
        password: Some("hunter2".to_string()),
        ..BlogsConfig::default()
    };
    BlogsService::new(config).unwrap()
}

fn atom_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, ATOM)
}

#[tokio::test]
async fn get_posts_parses_feed_with_default_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blogs/homepage/feed/entries/atom"))
        .and(query_param("page", "1"))
        .and(query_param("ps", "10"))
        .respond_with(atom_response(FEED))
        .expect(1)
        .mount(&server)
        .await;

    let feed = service_for(&server)
        .get_posts("homepage", &PostQuery::default())
        .await
        .unwrap();

    assert_eq!(feed.total_results, 75);
    assert_eq!(feed.entries.len(), 30);
    assert_eq!(feed.entries[0].hit, 71);
}

#[tokio::test]
async fn get_posts_sends_whitelisted_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blogs/homepage/feed/entries/atom"))
        .and(query_param("page", "3"))
        .and(query_param("ps", "50"))
        .and(query_param("search", "urlaub regelung"))
        .and(query_param("sortBy", "published"))
        .and(query_param("tags", "hr,news"))
        .respond_with(atom_response(FEED))
        .expect(1)
        .mount(&server)
        .await;

    let query = PostQuery {
        page: Some(3),
        ps: Some(50),
        search: Some("urlaub regelung".to_string()),
        sort_by: Some("published".to_string()),
        sort_order: None,
        tags: Some("hr,news".to_string()),
    };
    service_for(&server)
        .get_posts("homepage", &query)
        .await
        .unwrap();
}

#[tokio::test]
async fn requests_carry_basic_auth_and_atom_accept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Basic YWRhOmh1bnRlcjI="))
        .and(header("Accept", ATOM))
        .respond_with(atom_response(FEED))
        .expect(1)
        .mount(&server)
        .await;

    service_for(&server)
        .get_posts("homepage", &PostQuery::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn get_post_fetches_single_entry_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blogs/myblog/entry/atom"))
        .and(query_param(
            "entryid",
            "4a8d6ca2-fc47-433b-8061-989e14745b19",
        ))
        .respond_with(atom_response(POST))
        .expect(1)
        .mount(&server)
        .await;

    let post = service_for(&server)
        .get_post("myblog", "4a8d6ca2-fc47-433b-8061-989e14745b19")
        .await
        .unwrap();

    assert_eq!(post.id, "4a8d6ca2-fc47-433b-8061-989e14745b19");
    assert_eq!(post.status, "approved");
}

#[tokio::test]
async fn create_post_sends_entry_document_and_parses_echo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/blogs/myblog/feed/entries/atom"))
        .and(header("Content-Type", ATOM))
        .and(body_string_contains("<title type=\"text\">Herzlich Willkommen!</title>"))
        .and(body_string_contains("<category term=\"announcements\"/>"))
        .respond_with(
            ResponseTemplate::new(201).set_body_raw(POST, ATOM),
        )
        .expect(1)
        .mount(&server)
        .await;

    let draft = PostDraft {
        title: "Herzlich Willkommen!".to_string(),
        content: "<p>Willkommen im Community-Blog.</p>".to_string(),
        summary: None,
        tags: vec!["announcements".to_string()],
    };
    let post = service_for(&server)
        .create_post("myblog", &draft)
        .await
        .unwrap();

    assert_eq!(post.id, "4a8d6ca2-fc47-433b-8061-989e14745b19");
}

#[tokio::test]
async fn unexpected_status_is_surfaced_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such blog"))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .get_posts("missing", &PostQuery::default())
        .await
        .unwrap_err();

    match err {
        ServiceError::UnexpectedStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such blog");
        }
        e => panic!("expected UnexpectedStatus, got {e:?}"),
    }
}

#[tokio::test]
async fn create_expects_201_not_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(atom_response(POST))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .create_post("myblog", &PostDraft::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::UnexpectedStatus { status: 200, .. }
    ));
}

#[tokio::test]
async fn non_atom_content_type_is_rejected_before_parsing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html>login page</html>", "text/html;charset=UTF-8"),
        )
        .mount(&server)
        .await;

    let err = service_for(&server)
        .get_posts("homepage", &PostQuery::default())
        .await
        .unwrap_err();

    match err {
        ServiceError::UnexpectedContentType(ct) => assert!(ct.starts_with("text/html")),
        e => panic!("expected UnexpectedContentType, got {e:?}"),
    }
}

#[tokio::test]
async fn atom_content_type_with_charset_parameter_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(FEED, "application/atom+xml;charset=UTF-8"),
        )
        .mount(&server)
        .await;

    let feed = service_for(&server)
        .get_posts("homepage", &PostQuery::default())
        .await
        .unwrap();
    assert_eq!(feed.entries.len(), 30);
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(atom_response("<feed xmlns=\"http://www.w3.org/2005/Atom\">"))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .get_posts("homepage", &PostQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Parse(_)));
}
