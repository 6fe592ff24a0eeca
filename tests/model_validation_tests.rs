use club_blog::models::{
    BlogPost, CommentForm, LoginForm, PostForm, RegisterForm, User,
};

// --- Form Validation ---

fn valid_post_form() -> PostForm {
    PostForm {
        title: "First Post".to_string(),
        subtitle: "A beginning".to_string(),
        image_url: "https://example.com/cover.jpg".to_string(),
        body: "<p>Hello</p>".to_string(),
    }
}

#[test]
fn test_register_form_requires_all_fields() {
    let complete = RegisterForm {
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "hunter22".to_string(),
    };
    assert!(complete.validate().is_ok());

    // Each field is individually mandatory.
    for blank_field in ["name", "email", "password"] {
        let mut form = complete.clone();
        match blank_field {
            "name" => form.name.clear(),
            "email" => form.email.clear(),
            _ => form.password.clear(),
        }
        let err = form.validate().expect_err("blank field must fail");
        assert!(err.to_string().contains("required"));
    }
}

#[test]
fn test_register_form_rejects_whitespace_only_fields() {
    let form = RegisterForm {
        name: "   ".to_string(),
        email: "alice@example.com".to_string(),
        password: "hunter22".to_string(),
    };
    assert!(form.validate().is_err());
}

#[test]
fn test_login_form_requires_both_fields() {
    let form = LoginForm {
        email: "alice@example.com".to_string(),
        password: String::new(),
    };
    assert!(form.validate().is_err());

    let form = LoginForm {
        email: "alice@example.com".to_string(),
        password: "hunter22".to_string(),
    };
    assert!(form.validate().is_ok());
}

#[test]
fn test_post_form_accepts_http_and_https_image_urls() {
    assert!(valid_post_form().validate().is_ok());

    let mut form = valid_post_form();
    form.image_url = "http://example.com/cover.jpg".to_string();
    assert!(form.validate().is_ok());
}

#[test]
fn test_post_form_rejects_non_url_image() {
    let mut form = valid_post_form();
    form.image_url = "cover.jpg".to_string();

    let err = form.validate().expect_err("bare filename must fail the URL check");
    assert!(err.to_string().contains("URL"));
}

#[test]
fn test_post_form_requires_every_field() {
    for blank_field in ["title", "subtitle", "image_url", "body"] {
        let mut form = valid_post_form();
        match blank_field {
            "title" => form.title.clear(),
            "subtitle" => form.subtitle.clear(),
            "image_url" => form.image_url.clear(),
            _ => form.body.clear(),
        }
        assert!(form.validate().is_err(), "{blank_field} must be required");
    }
}

#[test]
fn test_comment_form_rejects_empty_text() {
    assert!(CommentForm { text: String::new() }.validate().is_err());
    assert!(
        CommentForm {
            text: "<p>Nice post!</p>".to_string()
        }
        .validate()
        .is_ok()
    );
}

// --- Serialization Shape ---

#[test]
fn test_user_serialization_never_exposes_password_hash() {
    // The hash travels into template contexts via serde; it must be stripped there.
    let user = User {
        id: 1,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        password_hash: "$pbkdf2-sha256$secret".to_string(),
        role: "admin".to_string(),
    };

    let json_output = serde_json::to_string(&user).unwrap();
    assert!(!json_output.contains("password_hash"));
    assert!(!json_output.contains("pbkdf2"));
    assert!(json_output.contains(r#""email":"alice@example.com""#));
}

#[test]
fn test_blog_post_carries_joined_author_name() {
    // author_name is absent on bare rows (sqlx default) but serialized when joined.
    let bare = BlogPost::default();
    assert!(bare.author_name.is_none());

    let joined = BlogPost {
        author_name: Some("Alice".to_string()),
        ..BlogPost::default()
    };
    let json_output = serde_json::to_string(&joined).unwrap();
    assert!(json_output.contains(r#""author_name":"Alice""#));
}

#[test]
fn test_user_is_admin_follows_role_attribute() {
    let admin = User {
        role: "admin".to_string(),
        ..User::default()
    };
    let member = User {
        role: "member".to_string(),
        ..User::default()
    };
    assert!(admin.is_admin());
    assert!(!member.is_admin());
}
