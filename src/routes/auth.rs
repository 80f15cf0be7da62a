use crate::{
    auth::{generate_token, hash_password, verify_password, AuthResponse, LoginRequest, SignupRequest},
    error::AppError,
    models::User,
};
use actix_web::{post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Register a new user
///
/// Creates a new user account and returns it without any password material.
#[post("/signup")]
pub async fn signup(
    pool: web::Data<PgPool>,
    signup_data: web::Json<SignupRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    signup_data.validate()?;

    // Check if username or email already exists
    let existing_user = sqlx::query_as::<_, (i32,)>(
        "SELECT id FROM users WHERE username = $1 OR email = $2",
    )
    .bind(&signup_data.username)
    .bind(&signup_data.email)
    .fetch_optional(&**pool)
    .await?;

    if existing_user.is_some() {
        return Err(AppError::Conflict(
            "username or email already registered".into(),
        ));
    }

    // Hash password
    let password_hash = hash_password(&signup_data.password)?;

    // Insert new user. The unique constraints on username and email also map
    // to Conflict, covering the race between the check above and this insert.
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3)
         RETURNING id, username, email, created_at",
    )
    .bind(&signup_data.username)
    .bind(&signup_data.email)
    .bind(&password_hash)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(user))
}

/// Login user
///
/// Authenticates a user by username and password and returns a bearer token.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data
        .validate()
        .map_err(|_| AppError::Unauthorized("Invalid credentials".into()))?;

    let user = sqlx::query_as::<_, (i32, String)>(
        "SELECT id, password_hash FROM users WHERE username = $1",
    )
    .bind(&login_data.username)
    .fetch_optional(&**pool)
    .await?;

    // Unknown username and wrong password produce the same response.
    match user {
        Some((user_id, password_hash)) => {
            if verify_password(&login_data.password, &password_hash)? {
                let token = generate_token(user_id)?;
                Ok(HttpResponse::Ok().json(AuthResponse { token, user_id }))
            } else {
                Err(AppError::Unauthorized("Invalid credentials".into()))
            }
        }
        None => Err(AppError::Unauthorized("Invalid credentials".into())),
    }
}
