use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    state::AppState,
    users::{
        dto::{
            AuthResponse, ChangePasswordRequest, LoginRequest, PublicUser, RegisterRequest,
            ResetPasswordRequest, UpdateProfileRequest,
        },
        validation::{normalize_email, validate_email, validate_name, validate_new_user},
        NewUser, Role, UserRecord,
    },
};

fn session(st: &AppState, user: &UserRecord) -> AuthResult<AuthResponse> {
    let token = st
        .authority
        .issue_session_token(user.id, user.role, st.clock.now())?;
    Ok(AuthResponse {
        token,
        user: PublicUser::from(user),
    })
}

async fn load(st: &AppState, user_id: Uuid) -> AuthResult<UserRecord> {
    st.store.find_by_id(user_id).await?.ok_or(AuthError::NotFound)
}

#[instrument(skip(st, payload))]
pub async fn register(st: &AppState, mut payload: RegisterRequest) -> AuthResult<AuthResponse> {
    payload.email = normalize_email(&payload.email);

    if let Err(e) = validate_new_user(&payload.name, &payload.email, &payload.password) {
        warn!(email = %payload.email, error = %e, "registration rejected");
        return Err(e);
    }

    // Ensure email is not taken before paying for a derivation
    if st.store.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::EmailTaken);
    }

    let password_secret = st.authority.derive_secret(&payload.password).await?;
    let user = st
        .store
        .create(NewUser {
            name: payload.name.trim().to_string(),
            email: payload.email,
            password_secret,
            avatar: payload.avatar,
            role: Role::default(),
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    session(st, &user)
}

#[instrument(skip(st, payload))]
pub async fn login(st: &AppState, mut payload: LoginRequest) -> AuthResult<AuthResponse> {
    payload.email = normalize_email(&payload.email);

    let Some(user) = st.store.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !st
        .authority
        .verify_password(&payload.password, &user.password_secret)
        .await?
    {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    session(st, &user)
}

#[instrument(skip(st))]
pub async fn get_user(st: &AppState, user_id: Uuid) -> AuthResult<PublicUser> {
    let user = load(st, user_id).await?;
    Ok(PublicUser::from(&user))
}

/// Applies a partial update. The secret is re-derived only when `password` is present.
#[instrument(skip(st, payload))]
pub async fn update_profile(
    st: &AppState,
    user_id: Uuid,
    payload: UpdateProfileRequest,
) -> AuthResult<PublicUser> {
    let mut user = load(st, user_id).await?;

    if let Some(name) = payload.name {
        validate_name(&name)?;
        user.name = name.trim().to_string();
    }
    if let Some(email) = payload.email {
        let email = normalize_email(&email);
        validate_email(&email)?;
        user.email = email;
    }
    if let Some(avatar) = payload.avatar {
        user.avatar = Some(avatar).filter(|a| !a.is_empty());
    }

    let rotated = st
        .authority
        .apply_password_change(&mut user, payload.password.as_deref())
        .await?;
    st.store.save(&user).await?;

    info!(user_id = %user.id, password_rotated = rotated, "profile updated");
    Ok(PublicUser::from(&user))
}

#[instrument(skip(st, payload))]
pub async fn change_password(
    st: &AppState,
    user_id: Uuid,
    payload: ChangePasswordRequest,
) -> AuthResult<AuthResponse> {
    let mut user = load(st, user_id).await?;

    if !st
        .authority
        .verify_password(&payload.current_password, &user.password_secret)
        .await?
    {
        warn!(user_id = %user.id, "change password with wrong current password");
        return Err(AuthError::InvalidCredentials);
    }

    st.authority
        .apply_password_change(&mut user, Some(&payload.new_password))
        .await?;
    st.store.save(&user).await?;

    info!(user_id = %user.id, "password changed");
    session(st, &user)
}

/// Issues a reset proof for `email` and returns its plaintext for out-of-band delivery.
/// `None` when no account owns the address.
#[instrument(skip(st, email))]
pub async fn request_password_reset(st: &AppState, email: &str) -> AuthResult<Option<String>> {
    let email = normalize_email(email);
    let Some(mut user) = st.store.find_by_email(&email).await? else {
        warn!(email = %email, "reset requested for unknown email");
        return Ok(None);
    };

    let token = st.authority.issue_reset_proof(&mut user, st.clock.now())?;
    st.store.save(&user).await?;
    Ok(Some(token))
}

/// Completes a reset: the proof must match and be unexpired, then the new password is
/// derived and the pending reset is cleared.
#[instrument(skip(st, payload))]
pub async fn reset_password(
    st: &AppState,
    payload: ResetPasswordRequest,
) -> AuthResult<AuthResponse> {
    let hash = crate::auth::reset::digest(&payload.token);
    let Some(mut user) = st.store.find_by_reset_hash(&hash).await? else {
        warn!("reset with unknown proof");
        return Err(AuthError::InvalidCredentials);
    };

    if !st
        .authority
        .verify_pending_reset(&user, &payload.token, st.clock.now())
    {
        warn!(user_id = %user.id, "reset with expired proof");
        return Err(AuthError::InvalidCredentials);
    }

    st.authority
        .apply_password_change(&mut user, Some(&payload.password))
        .await?;
    user.clear_pending_reset();
    st.store.save(&user).await?;

    info!(user_id = %user.id, "password reset completed");
    session(st, &user)
}
