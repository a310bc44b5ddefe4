use async_trait::async_trait;

use crate::{Res, types::AuthRecord};

/// Host callback notified whenever the client refreshes a record.
///
/// The refreshed record carries the opaque `user_id`, the new access token and
/// the new expiry. The client awaits the listener before returning the record,
/// and an error here fails the whole request, so a host persisting to durable
/// storage never hands out a token it could not save.
#[async_trait]
pub trait AuthUpdateListener: Send + Sync {
    async fn auth_updated(&self, record: &AuthRecord) -> Res<()>;
}
