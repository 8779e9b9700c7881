use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{self, request},
};
use inkwell_api::{AuthToken, User};

use crate::{Error, MockServer};

pub struct Auth(pub User);

#[async_trait]
impl FromRequestParts<MockServer> for Auth {
    type Rejection = Error;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &MockServer,
    ) -> Result<Auth, Error> {
        let token = bearer_token(req).ok_or(Error::unauthenticated())?;
        Ok(Auth(state.authenticate(&token)?))
    }
}

fn bearer_token(req: &request::Parts) -> Option<AuthToken> {
    let auth = req.headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let mut auth = auth.split(' ');
    if !auth.next()?.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = auth.next()?;
    if auth.next().is_some() || token.is_empty() {
        return None;
    }
    Some(AuthToken(String::from(token)))
}
