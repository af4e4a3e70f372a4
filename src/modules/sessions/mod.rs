//! Executive session flows: login, password change and logout.
//!
//! Each flow is exposed as a tower handler over [`Call`] so a tonic service
//! implementation can run it through the [`Pipeline`](crate::pipeline::Pipeline):
//!
//! ```ignore
//! let login = login_handler(sessions.clone());
//! pipeline.run(LOGIN_METHOD, request, login).await
//! ```

pub mod model;
pub mod service;

use std::sync::Arc;

use tonic::{Response, Status};
use tower::{Service, service_fn};

use crate::middleware::auth::AuthContext;
use crate::pipeline::Call;

pub use model::{
    ExecAccount, ExecDirectory, LoginRequest, LoginResponse, LogoutResponse,
    UpdatePasswordRequest, UpdatePasswordResponse,
};
pub use service::SessionService;

pub const LOGIN_METHOD: &str = "/school.ExecsService/Login";
pub const UPDATE_PASSWORD_METHOD: &str = "/school.ExecsService/UpdatePassword";
pub const LOGOUT_METHOD: &str = "/school.ExecsService/Logout";

fn caller<T>(call: &Call<T>) -> Result<AuthContext, Status> {
    call.auth()
        .cloned()
        .ok_or_else(|| Status::unauthenticated("missing caller context"))
}

pub fn login_handler<D: ExecDirectory>(
    sessions: Arc<SessionService<D>>,
) -> impl Service<
    Call<LoginRequest>,
    Response = Response<LoginResponse>,
    Error = Status,
    Future: Send + 'static,
> + Clone
+ Send
+ 'static {
    service_fn(move |call: Call<LoginRequest>| {
        let sessions = sessions.clone();
        async move {
            let request = call.into_request().into_inner();
            let response = sessions.login(request).await?;
            Ok::<_, Status>(Response::new(response))
        }
    })
}

pub fn update_password_handler<D: ExecDirectory>(
    sessions: Arc<SessionService<D>>,
) -> impl Service<
    Call<UpdatePasswordRequest>,
    Response = Response<UpdatePasswordResponse>,
    Error = Status,
    Future: Send + 'static,
> + Clone
+ Send
+ 'static {
    service_fn(move |call: Call<UpdatePasswordRequest>| {
        let sessions = sessions.clone();
        async move {
            let caller = caller(&call)?;
            let request = call.into_request().into_inner();
            let response = sessions.update_password(&caller, request).await?;
            Ok::<_, Status>(Response::new(response))
        }
    })
}

pub fn logout_handler<D: ExecDirectory>(
    sessions: Arc<SessionService<D>>,
) -> impl Service<
    Call<()>,
    Response = Response<LogoutResponse>,
    Error = Status,
    Future: Send + 'static,
> + Clone
+ Send
+ 'static {
    service_fn(move |call: Call<()>| {
        let sessions = sessions.clone();
        async move {
            let caller = caller(&call)?;
            let response = sessions.logout(&caller).await?;
            Ok::<_, Status>(Response::new(response))
        }
    })
}
