use crate::db::models::User;

/// Delivery channel for one-time tokens. No mail is sent; the default
/// implementation writes tokens to the log for the operator to relay.
pub trait Notifier: Send + Sync {
    fn reset_password_requested(&self, user: &User, token: &str);

    fn verification_requested(&self, user: &User, token: &str);

    fn registered(&self, user: &User) {
        tracing::info!(user_id = %user.id, "User {} has registered", user.email);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn reset_password_requested(&self, user: &User, token: &str) {
        tracing::info!(
            user_id = %user.id,
            "User {} has forgot their password. Reset token: {}",
            user.email,
            token
        );
    }

    fn verification_requested(&self, user: &User, token: &str) {
        tracing::info!(
            user_id = %user.id,
            "Verification requested for user {}. Verification token: {}",
            user.email,
            token
        );
    }
}
