use anyhow::Result;
use hyper::StatusCode;
use hyper::header::HeaderMap;
use tracing::{error, info, warn};

use shared::types::jwt::Role;
use shared::types::login::{LoginData, LoginError, LoginResponse};

use crate::auth::SessionSubject;
use crate::database::utils::{sanitize_string, verify_password};
use crate::database::{admins, affiliates};
use crate::handlers::http::auth::session_cookie;
use crate::handlers::http::utils;
use crate::{AppState, HttpResponse, IncomingRequest, ReqBody};

/// Display name carried in admin sessions.
const ADMIN_DISPLAY_NAME: &str = "Admin";

/// `POST /api/auth/login`
///
/// Accepts JSON or a urlencoded form.  `type` picks the account table.
pub async fn handle_login(req: IncomingRequest, state: AppState) -> Result<HttpResponse> {
    info!("Processing login request");

    let (parts, body) = req.into_parts();
    let data = parse_login(&parts.headers, body).await;

    let role = match validate_login(&data) {
        Ok(role) => role,
        Err(login_error) => {
            warn!("Login validation failed: {:?}", login_error);
            return deliver_login_error(&login_error);
        }
    };

    let subject = match attempt_login(&data, role, &state).await {
        Ok(subject) => subject,
        Err(login_error) => {
            warn!("Login failed for {}: {:?}", data.email, login_error);
            return deliver_login_error(&login_error);
        }
    };

    let cookie = session_cookie(&state, &subject)?;
    info!("{} logged in: {}", role, subject.email);

    utils::deliver_json_with_cookie(&LoginResponse::success(role), StatusCode::OK, cookie)
}

/// Read the body as a form or JSON.  An unreadable body yields empty
/// fields, which validation reports as missing credentials.
async fn parse_login(headers: &HeaderMap, body: ReqBody) -> LoginData {
    let mut data = if utils::is_form_request(headers) {
        match utils::read_form(body).await {
            Ok(params) => LoginData {
                email: params
                    .get("email")
                    .or_else(|| params.get("username"))
                    .cloned()
                    .unwrap_or_default(),
                password: params.get("password").cloned().unwrap_or_default(),
                login_type: params.get("type").cloned().unwrap_or_default(),
            },
            Err(e) => {
                warn!("Unreadable login form: {}", e);
                LoginData::default()
            }
        }
    } else {
        utils::read_json::<LoginData, _>(body)
            .await
            .unwrap_or_default()
    };

    data.email = sanitize_string(&data.email);
    data
}

fn validate_login(data: &LoginData) -> std::result::Result<Role, LoginError> {
    if data.email.is_empty() || data.password.is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    data.login_type
        .parse::<Role>()
        .map_err(|_| LoginError::InvalidLoginType)
}

/// Check the password against the account table selected by `role`.
async fn attempt_login(
    data: &LoginData,
    role: Role,
    state: &AppState,
) -> std::result::Result<SessionSubject, LoginError> {
    let (id, stored_hash, name) = match role {
        Role::Admin => {
            let admin = admins::find_admin_by_email(&state.db, &data.email)
                .await
                .map_err(|e| {
                    error!("Database error looking up admin: {}", e);
                    LoginError::InternalError
                })?
                .ok_or(LoginError::InvalidCredentials)?;
            (admin.id, admin.password_hash, ADMIN_DISPLAY_NAME.to_string())
        }
        Role::Partner => {
            let affiliate = affiliates::find_affiliate_by_email(&state.db, &data.email)
                .await
                .map_err(|e| {
                    error!("Database error looking up affiliate: {}", e);
                    LoginError::InternalError
                })?
                .ok_or(LoginError::InvalidCredentials)?;
            let hash = affiliate
                .password_hash
                .ok_or(LoginError::InvalidCredentials)?;
            (affiliate.id, hash, affiliate.name)
        }
    };

    let password_valid = verify_password(&stored_hash, &data.password).map_err(|e| {
        error!("Password verification error: {}", e);
        LoginError::InternalError
    })?;

    if !password_valid {
        return Err(LoginError::InvalidCredentials);
    }

    Ok(SessionSubject {
        id,
        email: data.email.clone(),
        role,
        name,
    })
}

fn deliver_login_error(login_error: &LoginError) -> Result<HttpResponse> {
    let status = match login_error {
        LoginError::MissingCredentials | LoginError::InvalidLoginType => StatusCode::BAD_REQUEST,
        LoginError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        LoginError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    };
    utils::deliver_serialized_json(&login_error.to_response(), status)
}
