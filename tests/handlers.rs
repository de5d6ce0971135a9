mod common;

use common::{TestClient, PASSWORD};
use snipbox::store::{SnippetStore, UserStore};

#[tokio::test]
async fn snippet_view_rejects_bad_ids() {
    let mut client = TestClient::new();
    client.app().snippets.insert("Hello", "world", 1).await.unwrap();

    for (path, status) in [
        ("/snippet/view/1", 200),
        ("/snippet/view/2", 404),
        ("/snippet/view/-1", 404),
        ("/snippet/view/1.23", 404),
        ("/snippet/view/foo", 404),
        ("/snippet/view/", 404),
    ] {
        let res = client.get(path).await;
        assert_eq!(res.status, status, "{path}");
    }
}

#[tokio::test]
async fn home_lists_latest_snippets() {
    let mut client = TestClient::new();
    client.app().snippets.insert("First <post>", "a", 7).await.unwrap();

    let res = client.get("/").await;
    assert_eq!(res.status, 200);
    assert!(res.body.contains("First &lt;post&gt;"));
    assert!(res.body.contains(r#"href="/snippet/view/1""#));
}

#[tokio::test]
async fn signup_validation() {
    let mut client = TestClient::new();
    client.signup("Alice", "alice@example.com").await;

    let cases: [(&str, &str, &str, &str); 5] = [
        ("", "bob@example.com", PASSWORD, "This field cannot be blank"),
        ("Bob", "", PASSWORD, "This field cannot be blank"),
        ("Bob", "bob@example.", PASSWORD, "This field must be a valid email address"),
        ("Bob", "bob@example.com", "pa$$", "This field must be at least 8 characters"),
        ("Bob", "alice@example.com", PASSWORD, "Email address is already in use"),
    ];
    for (name, email, password, message) in cases {
        let token = client.csrf_token_from("/user/signup").await;
        let res = client.post_form("/user/signup", &[
            ("name", name),
            ("email", email),
            ("password", password),
            ("csrf_token", &token),
        ])
        .await;
        assert_eq!(res.status, 422, "{email}");
        assert!(res.body.contains(message), "{email}: missing `{message}`");
        assert!(!res.body.contains(password) || password.is_empty());
    }
}

#[tokio::test]
async fn signup_success_redirects_to_login_with_flash() {
    let mut client = TestClient::new();
    let res = client.signup("Alice", "alice@example.com").await;
    assert_eq!(res.status, 303);
    assert_eq!(res.location(), Some("/user/login"));

    let res = client.get("/user/login").await;
    assert!(res.body.contains("Your signup was successful. Please log in."));
}

#[tokio::test]
async fn bad_credentials_are_a_form_error() {
    let mut client = TestClient::new();
    client.signup("Alice", "alice@example.com").await;

    let res = client.login("alice@example.com", "wrong password").await;
    assert_eq!(res.status, 422);
    assert!(res.body.contains("Email or password is incorrect"));
    assert!(res.body.contains(r#"value="alice@example.com""#));
    assert!(client.get("/account/view").await.status == 303);
}

#[tokio::test]
async fn snippet_create_validation() {
    let mut client = TestClient::new();
    client.signed_in("alice@example.com").await;

    let res = client.get("/snippet/create").await;
    assert_eq!(res.status, 200);
    assert!(res.body.contains(r#"value="365" checked"#));

    let long_title = "a".repeat(101);
    let cases = [
        ("", "content", "7", "This field cannot be blank"),
        (long_title.as_str(), "content", "7", "This field cannot be more than 100 characters"),
        ("Title", "  ", "7", "This field cannot be blank"),
        ("Title", "content", "30", "This field must equal 1, 7 or 365"),
    ];
    for (title, content, expires, message) in cases {
        let token = client.csrf_token_from("/snippet/create").await;
        let res = client.post_form("/snippet/create", &[
            ("title", title),
            ("content", content),
            ("expires", expires),
            ("csrf_token", &token),
        ])
        .await;
        assert_eq!(res.status, 422);
        assert!(res.body.contains(message), "missing `{message}`");
    }

    let token = client.csrf_token_from("/snippet/create").await;
    let res = client.post_form("/snippet/create", &[
        ("title", "Title"),
        ("content", "content"),
        ("expires", "soon"),
        ("csrf_token", &token),
    ])
    .await;
    assert_eq!(res.status, 400);

    assert!(client.app().snippets.latest().await.unwrap().is_empty());
}

#[tokio::test]
async fn password_update_success_redirects_with_flash() {
    let mut client = TestClient::new();
    client.signed_in("alice@example.com").await;
    let before = client.cookie("session").unwrap().to_owned();

    let token = client.csrf_token_from("/account/password/update").await;
    let res = client.post_form("/account/password/update", &[
        ("current_password", PASSWORD),
        ("new_password", "n3w-pa$$word"),
        ("new_password_confirmation", "n3w-pa$$word"),
        ("csrf_token", &token),
    ])
    .await;
    assert_eq!(res.status, 303);
    assert_eq!(res.location(), Some("/account/view"));
    assert_ne!(client.cookie("session").unwrap(), before);

    let res = client.get("/account/view").await;
    assert_eq!(res.status, 200);
    assert!(res.body.contains("Your password has been updated!"));

    let users = &client.app().users;
    assert!(users.authenticate("alice@example.com", "n3w-pa$$word").await.is_ok());
    assert!(users.authenticate("alice@example.com", PASSWORD).await.is_err());
}

#[tokio::test]
async fn password_update_validation() {
    let mut client = TestClient::new();
    client.signed_in("alice@example.com").await;

    let cases = [
        ("wrong password", "n3w-pa$$word", "n3w-pa$$word", "Current password is incorrect"),
        (PASSWORD, "short", "short", "This field must be at least 8 characters"),
        (PASSWORD, "n3w-pa$$word", "different!", "Passwords do not match"),
        ("", "n3w-pa$$word", "n3w-pa$$word", "This field cannot be blank"),
    ];
    for (current, new, confirmation, message) in cases {
        let token = client.csrf_token_from("/account/password/update").await;
        let res = client.post_form("/account/password/update", &[
            ("current_password", current),
            ("new_password", new),
            ("new_password_confirmation", confirmation),
            ("csrf_token", &token),
        ])
        .await;
        assert_eq!(res.status, 422);
        assert!(res.body.contains(message), "missing `{message}`");
    }

    let users = &client.app().users;
    assert!(users.authenticate("alice@example.com", PASSWORD).await.is_ok());
}

#[tokio::test]
async fn account_page_for_a_vanished_user_redirects_to_login() {
    let mut client = TestClient::new();
    client.signed_in("alice@example.com").await;
    let res = client.get("/account/view").await;
    assert!(res.body.contains("Alice"));
    let joined = regex::Regex::new(r"<td>\d{2} \w{3} \d{4} at \d{2}:\d{2}</td>").unwrap();
    assert!(joined.is_match(&res.body));

    let id = client.app().users.authenticate("alice@example.com", PASSWORD).await.unwrap();
    client.app().users.remove(id);
    let res = client.get("/account/view").await;
    assert_eq!(res.status, 303);
    assert_eq!(res.location(), Some("/user/login"));
}
