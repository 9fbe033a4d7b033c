//! GitHub client tests.

use std::time::Duration;

use mirrorshift::migration::{
    adapters::github::{GitHubClient, GitHubConfig},
    domain::{TargetLocation, TargetRepositoryName},
    ports::{RepositoryCreation, TargetHost, TargetHostError},
};
use rstest::rstest;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{bearer_token, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "ghp_wiremock";

fn client_for(server: &MockServer, max_attempts: u32) -> GitHubClient {
    let api = Url::parse(&format!("{}/", server.uri())).expect("valid URL");
    let git = Url::parse("https://github.com/").expect("valid URL");
    let config =
        GitHubConfig::new(api, git).with_retries(max_attempts, Duration::from_millis(10));
    GitHubClient::new(config).expect("client builds")
}

fn credential() -> SecretString {
    SecretString::from(TOKEN)
}

fn name(raw: &str) -> TargetRepositoryName {
    TargetRepositoryName::derive(raw).expect("valid name")
}

fn target(raw: &str) -> TargetLocation {
    TargetLocation::parse(raw).expect("valid target")
}

#[rstest]
#[case("org:acme", "/orgs/acme/repos", "acme/billing")]
#[case("user:octocat", "/user/repos", "octocat/billing")]
#[tokio::test]
async fn creation_posts_to_namespace_endpoint(
    #[case] location: &str,
    #[case] endpoint: &str,
    #[case] full_name: &str,
) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoint))
        .and(bearer_token(TOKEN))
        .and(header("X-GitHub-Api-Version", "2022-11-28"))
        .and(body_json(json!({ "name": "billing", "private": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "billing",
            "full_name": full_name,
            "private": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server, 3)
        .ensure_repository(&credential(), &target(location), &name("Billing"))
        .await;

    assert_eq!(
        outcome,
        Ok(RepositoryCreation::Created {
            full_name: full_name.to_owned(),
        })
    );
}

#[rstest]
#[case(json!({
    "message": "Repository creation failed.",
    "errors": [{
        "resource": "Repository",
        "code": "custom",
        "field": "name",
        "message": "name already exists on this account"
    }]
}))]
#[case(json!({
    "message": "Validation Failed",
    "errors": [{ "resource": "Repository", "field": "name", "code": "already_exists" }]
}))]
#[tokio::test]
async fn name_conflict_is_reported_as_existing(#[case] body: serde_json::Value) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(422).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server, 3)
        .ensure_repository(&credential(), &target("org:acme"), &name("billing"))
        .await;

    assert_eq!(outcome, Ok(RepositoryCreation::AlreadyExists));
}

#[tokio::test]
async fn other_validation_failures_are_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Visibility can't be private. Please upgrade your plan.",
            "errors": [{ "resource": "Repository", "field": "visibility", "code": "invalid" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server, 3)
        .ensure_repository(&credential(), &target("org:acme"), &name("billing"))
        .await;

    assert_eq!(
        outcome,
        Err(TargetHostError::Api {
            status: 422,
            message: "Visibility can't be private. Please upgrade your plan: visibility invalid"
                .to_owned(),
        })
    );
}

#[tokio::test]
async fn validation_details_are_kept_in_the_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Validation Failed",
            "errors": [{
                "resource": "Repository",
                "field": "name",
                "code": "custom",
                "message": "name is too long (maximum is 100 characters)"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server, 3)
        .ensure_repository(&credential(), &target("org:acme"), &name("billing"))
        .await;

    assert_eq!(
        outcome,
        Err(TargetHostError::Api {
            status: 422,
            message: "Validation Failed: name is too long (maximum is 100 characters)".to_owned(),
        })
    );
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "billing",
            "full_name": "acme/billing"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server, 3)
        .ensure_repository(&credential(), &target("org:acme"), &name("billing"))
        .await;

    assert_eq!(
        outcome,
        Ok(RepositoryCreation::Created {
            full_name: "acme/billing".to_owned(),
        })
    );
}

#[tokio::test]
async fn retries_stop_after_the_configured_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "message": "Service Unavailable"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let outcome = client_for(&server, 2)
        .ensure_repository(&credential(), &target("org:acme"), &name("billing"))
        .await;

    assert_eq!(
        outcome,
        Err(TargetHostError::Api {
            status: 503,
            message: "Service Unavailable".to_owned(),
        })
    );
}

#[tokio::test]
async fn authentication_failures_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Bad credentials",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server, 3)
        .ensure_repository(&credential(), &target("org:acme"), &name("billing"))
        .await;

    assert_eq!(
        outcome,
        Err(TargetHostError::Api {
            status: 401,
            message: "Bad credentials".to_owned(),
        })
    );
}

#[tokio::test]
async fn organisations_are_listed_across_pages() {
    let server = MockServer::start().await;
    let first_page: Vec<_> = (0..100)
        .map(|index| json!({ "login": format!("org-{index:03}") }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "login": "acme" }])))
        .mount(&server)
        .await;

    let organizations = client_for(&server, 1)
        .list_organizations(&credential())
        .await
        .expect("listing succeeds");

    assert_eq!(organizations.len(), 101);
    assert_eq!(organizations.first().map(String::as_str), Some("org-000"));
    assert_eq!(organizations.last().map(String::as_str), Some("acme"));
}

#[tokio::test]
async fn user_repositories_are_limited_to_owned_ones() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("affiliation", "owner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "dotfiles", "full_name": "octocat/dotfiles", "private": false },
            { "name": "billing", "full_name": "octocat/billing", "private": true }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let repositories = client_for(&server, 1)
        .list_repositories(&credential(), &target("user:octocat"))
        .await
        .expect("listing succeeds");

    let private: Vec<(&str, bool)> = repositories
        .iter()
        .map(|repository| (repository.full_name.as_str(), repository.private))
        .collect();
    assert_eq!(
        private,
        [("octocat/dotfiles", false), ("octocat/billing", true)]
    );
}
