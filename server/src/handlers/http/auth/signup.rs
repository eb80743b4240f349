use anyhow::Result;
use hyper::StatusCode;
use hyper::header::HeaderMap;
use tracing::{error, info, warn};

use shared::types::jwt::Role;
use shared::types::signup::{SignupData, SignupError, SignupResponse};

use crate::auth::SessionSubject;
use crate::database::affiliates::{self, Affiliate, NewAffiliate};
use crate::database::utils::{
    generate_referral_code, hash_password, is_valid_email, sanitize_string,
};
use crate::handlers::http::auth::session_cookie;
use crate::handlers::http::utils;
use crate::{AppState, HttpResponse, IncomingRequest, ReqBody};

/// Attempts at finding an unused referral code before giving up.
const REFERRAL_CODE_ATTEMPTS: usize = 16;

/// `POST /api/auth/signup`: partner self-registration.
///
/// The new affiliate starts out `Pending` and is signed in straight away.
pub async fn handle_signup(req: IncomingRequest, state: AppState) -> Result<HttpResponse> {
    info!("Processing signup request");

    let (parts, body) = req.into_parts();
    let data = parse_signup(&parts.headers, body).await;

    if let Err(signup_error) = validate_signup(&data) {
        warn!("Signup validation failed: {:?}", signup_error);
        return deliver_signup_error(&signup_error);
    }

    let affiliate = match register_affiliate(&data, &state).await {
        Ok(affiliate) => affiliate,
        Err(signup_error) => {
            warn!("Signup failed for {}: {:?}", data.email, signup_error);
            return deliver_signup_error(&signup_error);
        }
    };

    let cookie = session_cookie(
        &state,
        &SessionSubject {
            id: affiliate.id,
            email: affiliate.email,
            role: Role::Partner,
            name: affiliate.name,
        },
    )?;

    utils::deliver_json_with_cookie(&SignupResponse::created(), StatusCode::OK, cookie)
}

async fn parse_signup(headers: &HeaderMap, body: ReqBody) -> SignupData {
    let data = if utils::is_form_request(headers) {
        match utils::read_form(body).await {
            Ok(mut params) => SignupData {
                name: params.remove("name").unwrap_or_default(),
                email: params.remove("email").unwrap_or_default(),
                phone: params.remove("phone"),
                location: params.remove("location"),
                password: params.remove("password").unwrap_or_default(),
            },
            Err(e) => {
                warn!("Unreadable signup form: {}", e);
                SignupData::default()
            }
        }
    } else {
        utils::read_json::<SignupData, _>(body)
            .await
            .unwrap_or_default()
    };

    SignupData {
        name: sanitize_string(&data.name),
        email: sanitize_string(&data.email),
        phone: data.phone.map(|p| sanitize_string(&p)),
        ..data
    }
}

fn validate_signup(data: &SignupData) -> std::result::Result<(), SignupError> {
    if data.name.is_empty() || data.email.is_empty() || data.password.is_empty() {
        return Err(SignupError::MissingFields);
    }

    if !is_valid_email(&data.email) {
        return Err(SignupError::InvalidEmail);
    }

    Ok(())
}

async fn register_affiliate(
    data: &SignupData,
    state: &AppState,
) -> std::result::Result<Affiliate, SignupError> {
    let internal = |e: &dyn std::fmt::Display| {
        error!("Signup internal error: {}", e);
        SignupError::InternalError
    };

    if affiliates::email_exists(&state.db, &data.email)
        .await
        .map_err(|e| internal(&e))?
    {
        return Err(SignupError::EmailTaken);
    }

    let password_hash = hash_password(&data.password).map_err(|e| internal(&e))?;
    let referral_code = unique_referral_code(&data.name, state).await?;

    affiliates::create_affiliate(
        &state.db,
        NewAffiliate {
            name: data.name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone().unwrap_or_default(),
            password_hash,
            referral_code,
        },
    )
    .await
    .map_err(|e| creation_error(&e))
}

/// A signup racing another for the same email loses at the `UNIQUE`
/// constraint rather than at the existence check.
fn creation_error(err: &sqlx::Error) -> SignupError {
    if affiliates::is_email_conflict(err) {
        warn!("Signup lost a race for an existing email");
        return SignupError::EmailTaken;
    }
    error!("Signup internal error: {}", err);
    SignupError::InternalError
}

/// Generate referral codes until one is not taken.
async fn unique_referral_code(
    name: &str,
    state: &AppState,
) -> std::result::Result<String, SignupError> {
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        let code = generate_referral_code(name);
        match affiliates::referral_code_exists(&state.db, &code).await {
            Ok(false) => return Ok(code),
            Ok(true) => continue,
            Err(e) => {
                error!("Failed to check referral code {}: {}", code, e);
                return Err(SignupError::InternalError);
            }
        }
    }

    error!(
        "No free referral code for {} after {} attempts",
        name, REFERRAL_CODE_ATTEMPTS
    );
    Err(SignupError::InternalError)
}

fn deliver_signup_error(signup_error: &SignupError) -> Result<HttpResponse> {
    let status = match signup_error {
        SignupError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    utils::deliver_serialized_json(&signup_error.to_response(), status)
}
