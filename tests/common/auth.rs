use aviprep_backend::auth::{sign_jwt_for_admin, sign_jwt_for_user};
use aviprep_backend::config::Config;

#[allow(dead_code)]
pub fn user_token(config: &Config, user_id: &str) -> String {
    sign_jwt_for_user(user_id, &config.jwt_secret, 1).expect("sign user token")
}

#[allow(dead_code)]
pub fn admin_token(config: &Config, admin_id: &str) -> String {
    sign_jwt_for_admin(admin_id, &config.admin_jwt_secret, 1).expect("sign admin token")
}

#[allow(dead_code)]
pub fn auth_header(token: &str) -> String {
    format!("Bearer {token}")
}
