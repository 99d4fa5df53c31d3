use axum::response::{IntoResponse, Response};
use axum::Json;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;

use crate::models::user::Role;
use crate::responses::JsonResponse;

struct DemoUser {
    email: &'static str,
    password: &'static str,
    role: Role,
}

// Demo credentials only; there is deliberately no real account system.
static DEMO_USERS: Lazy<[DemoUser; 3]> = Lazy::new(|| {
    [
        DemoUser {
            email: "user@civicx.com",
            password: "civix123",
            role: Role::User,
        },
        DemoUser {
            email: "admin@civicx.com",
            password: "admin123",
            role: Role::Admin,
        },
        DemoUser {
            email: "worker@civicx.com",
            password: "worker123",
            role: Role::Worker,
        },
    ]
});

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

pub async fn handle_login(Json(payload): Json<LoginPayload>) -> Response {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return JsonResponse::bad_request("Please enter both email and password").into_response();
    }

    match DEMO_USERS
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == payload.password)
    {
        Some(user) => Json(json!({
            "success": true,
            "email": user.email,
            "role": user.role,
        }))
        .into_response(),
        None => JsonResponse::unauthorized(
            "Invalid credentials. Try user@civicx.com / civix123 for demo access.",
        )
        .into_response(),
    }
}
