//! Integration tests for route matching
//!
//! Tests are organized by feature area and cover:
//! - Template compilation (static, dynamic, optional, constrained, wildcard)
//! - Single best match vs. full match chain
//! - Root passthrough and layout containers
//! - Parameter extraction and decoding
//! - Route redirects and metadata
//! - Malformed templates

use rhtmx_client_router::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn app_routes() -> Vec<RouteNode> {
    vec![RouteNode::root().with_component("App").with_children([
        RouteNode::new("about").with_component("About"),
        RouteNode::new("users")
            .with_component("UsersLayout")
            .with_meta("section", "users")
            .with_children([
                RouteNode::new("").with_component("UserList"),
                RouteNode::new("new").with_component("UserNew"),
                RouteNode::new(":id")
                    .with_component("UserDetail")
                    .with_meta("requiresAuth", true)
                    .with_child(RouteNode::new("posts/:postId").with_component("UserPost")),
            ]),
        RouteNode::new("docs/*path").with_component("Docs"),
        RouteNode::new("legacy/:id").with_redirect("/users/:id"),
    ])]
}

fn component<'a>(found: &'a MatchResult<'_>) -> &'a str {
    found
        .route
        .component
        .as_ref()
        .map(|c| c.as_str())
        .unwrap_or("")
}

// ========================================================================
// Basic Matching
// ========================================================================

#[test]
fn test_users_id_extracts_param() {
    let routes = vec![RouteNode::new("users/:id")];
    let found = match_route(&routes, "/users/123").unwrap().unwrap();
    assert_eq!(found.path, "/users/:id");
    assert_eq!(found.params.get("id"), Some(&"123".to_string()));
}

#[test]
fn test_non_matching_literal() {
    let routes = vec![RouteNode::new("about")];
    assert!(match_route(&routes, "/contact").unwrap().is_none());
    assert!(find_matching_routes(&routes, "/contact").unwrap().is_empty());
}

#[test]
fn test_static_beats_param_by_declaration_order() {
    let routes = app_routes();

    let found = match_route(&routes, "/users/new").unwrap().unwrap();
    assert_eq!(component(&found), "UserNew");
    assert!(found.params.is_empty());

    let found = match_route(&routes, "/users/123").unwrap().unwrap();
    assert_eq!(component(&found), "UserDetail");
    assert_eq!(found.params.get("id"), Some(&"123".to_string()));
}

#[test]
fn test_trailing_slash_is_accepted() {
    let routes = app_routes();
    let found = match_route(&routes, "/about/").unwrap().unwrap();
    assert_eq!(component(&found), "About");
}

#[rstest]
#[case("/", "App")]
#[case("/about", "About")]
#[case("/users", "UserList")]
#[case("/users/7/posts/9", "UserPost")]
#[case("/docs/guide/install", "Docs")]
#[case("/docs", "Docs")]
fn test_leaf_components(#[case] path: &str, #[case] expected: &str) {
    let routes = app_routes();
    let found = match_route(&routes, path).unwrap().unwrap();
    assert_eq!(component(&found), expected);
}

#[test]
fn test_unmatched_child_path_has_no_match() {
    let routes = app_routes();
    assert!(match_route(&routes, "/users/7/comments").unwrap().is_none());
}

// ========================================================================
// Match Chain Tests
// ========================================================================

#[test]
fn test_parent_child_single_match_vs_chain() {
    let routes = vec![RouteNode::new("parent").with_child(RouteNode::new("child"))];

    let found = match_route(&routes, "/parent/child").unwrap().unwrap();
    assert_eq!(found.path, "/parent/child");

    let chain = find_matching_routes(&routes, "/parent/child").unwrap();
    let paths: Vec<&str> = chain.iter().map(|m| m.path.as_str()).collect();
    assert_eq!(paths, vec!["/parent", "/parent/child"]);
}

#[test]
fn test_chain_last_equals_single_match() {
    let routes = app_routes();
    for path in ["/", "/about", "/users", "/users/3", "/users/3/posts/4", "/docs/a"] {
        let single = match_route(&routes, path).unwrap().unwrap();
        let chain = find_matching_routes(&routes, path).unwrap();
        assert_eq!(chain.last(), Some(&single), "path {}", path);
    }
}

#[test]
fn test_chain_carries_ancestor_params_and_meta() {
    let routes = app_routes();
    let chain = find_matching_routes(&routes, "/users/42/posts/7").unwrap();

    let components: Vec<&str> = chain.iter().map(component).collect();
    assert_eq!(components, vec!["App", "UsersLayout", "UserDetail", "UserPost"]);

    let detail = &chain[2];
    assert_eq!(detail.path, "/users/:id");
    assert_eq!(detail.params.get("id"), Some(&"42".to_string()));
    assert_eq!(detail.meta.get("requiresAuth"), Some(&json!(true)));

    let post = &chain[3];
    assert_eq!(post.params.get("id"), Some(&"42".to_string()));
    assert_eq!(post.params.get("postId"), Some(&"7".to_string()));
    assert!(post.meta.is_empty());

    assert_eq!(chain[1].meta.get("section"), Some(&json!("users")));
}

#[test]
fn test_root_alone_matches_only_root() {
    let routes = vec![RouteNode::root().with_children([RouteNode::new("about")])];

    let chain = find_matching_routes(&routes, "/").unwrap();
    assert_eq!(chain.len(), 1);
    assert!(chain[0].route.is_root());

    assert!(match_route(&routes, "/missing").unwrap().is_none());
}

#[test]
fn test_layout_matches_itself_when_no_child_does() {
    let routes = vec![RouteNode::new("settings")
        .with_component("SettingsLayout")
        .with_children([RouteNode::new("profile"), RouteNode::new("security")])];

    let found = match_route(&routes, "/settings").unwrap().unwrap();
    assert_eq!(component(&found), "SettingsLayout");

    let chain = find_matching_routes(&routes, "/settings/security").unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].path, "/settings");
}

#[test]
fn test_prefix_does_not_cross_segment_boundary() {
    let routes = vec![
        RouteNode::new("user").with_child(RouteNode::new("*")),
        RouteNode::new("username").with_component("Username"),
    ];

    let found = match_route(&routes, "/username").unwrap().unwrap();
    assert_eq!(component(&found), "Username");

    let chain = find_matching_routes(&routes, "/user/anything").unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].params.get("wildcard"), Some(&"anything".to_string()));
}

#[test]
fn test_matcher_with_prefix() {
    let routes = vec![RouteNode::new("reports/:year")];
    let matcher = RouteMatcher::new();

    let found = matcher
        .match_route(&routes, "/admin/reports/2024", "/admin")
        .unwrap()
        .unwrap();
    assert_eq!(found.path, "/admin/reports/:year");
    assert!(matcher.match_route(&routes, "/reports/2024", "/admin").unwrap().is_none());
}

// ========================================================================
// Parameter Extraction Tests
// ========================================================================

#[test]
fn test_extract_params_basic() {
    let params = extract_params("/users/:id/posts/:postId", "/users/5/posts/10").unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!(params.get("id"), Some(&"5".to_string()));
    assert_eq!(params.get("postId"), Some(&"10".to_string()));
}

#[test]
fn test_extract_params_no_match_is_empty() {
    assert!(extract_params("/users/:id", "/teams/5").unwrap().is_empty());
}

#[test]
fn test_extract_params_is_never_coerced() {
    let params = extract_params("/items/:n", "/items/007").unwrap();
    assert_eq!(params.get("n"), Some(&"007".to_string()));
}

#[rstest]
#[case("/tags/:tag", "/tags/caf%C3%A9", "tag", "café")]
#[case("/tags/:tag", "/tags/a%2Fb", "tag", "a/b")]
#[case("/tags/:tag", "/tags/100%", "tag", "100%")]
#[case("/files/*path", "/files/a/b%20c.txt", "path", "a/b c.txt")]
fn test_extract_params_decoding(
    #[case] template: &str,
    #[case] pathname: &str,
    #[case] key: &str,
    #[case] expected: &str,
) {
    let params = extract_params(template, pathname).unwrap();
    assert_eq!(params.get(key).map(String::as_str), Some(expected));
}

#[test]
fn test_optional_and_constrained_params() {
    let routes = vec![
        RouteNode::new(r"orders/:id(\d+)").with_component("Order"),
        RouteNode::new("orders/:slug").with_component("OrderBySlug"),
        RouteNode::new("archive/:year?").with_component("Archive"),
    ];

    let found = match_route(&routes, "/orders/12").unwrap().unwrap();
    assert_eq!(component(&found), "Order");
    let found = match_route(&routes, "/orders/latest").unwrap().unwrap();
    assert_eq!(component(&found), "OrderBySlug");

    let found = match_route(&routes, "/archive").unwrap().unwrap();
    assert!(found.params.is_empty());
    let found = match_route(&routes, "/archive/2023").unwrap().unwrap();
    assert_eq!(found.params.get("year"), Some(&"2023".to_string()));
}

// ========================================================================
// Redirect and Metadata Tests
// ========================================================================

#[test]
fn test_redirect_route_target() {
    let routes = app_routes();
    let found = match_route(&routes, "/legacy/99").unwrap().unwrap();
    assert_eq!(found.route.redirect_target(&found.params).unwrap(), "/users/99");
}

#[test]
fn test_meta_defaults_to_empty() {
    let routes = app_routes();
    let found = match_route(&routes, "/about").unwrap().unwrap();
    assert!(found.meta.is_empty());
}

// ========================================================================
// Malformed Template Tests
// ========================================================================

#[rstest]
#[case("files/*rest/edit", PatternErrorKind::WildcardNotLast("*rest".to_string()))]
#[case("a/:x/b/:x", PatternErrorKind::DuplicateParam("x".to_string()))]
#[case("a/:", PatternErrorKind::MissingParamName(":".to_string()))]
#[case("a/:id((x))", PatternErrorKind::CapturingGroup("id".to_string()))]
#[case(r"a/:id((?P<n>\d+))/:b", PatternErrorKind::CapturingGroup("id".to_string()))]
fn test_malformed_templates(#[case] template: &str, #[case] expected: PatternErrorKind) {
    let routes = vec![RouteNode::new(template)];
    let err = RouteMatcher::new().match_route(&routes, "/a", "").unwrap_err();
    assert_eq!(err.kind, expected);
}

#[test]
fn test_clear_matcher_cache_keeps_matching() {
    let routes = app_routes();
    assert!(match_route(&routes, "/about").unwrap().is_some());
    clear_matcher_cache();
    assert!(match_route(&routes, "/about").unwrap().is_some());
}
