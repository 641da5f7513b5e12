use crate::guard::LoginGuard;
use crate::portal::PortalPolicy;

// app's shared state
pub struct AppState {
    pub login_guard: LoginGuard,
    pub portal_policy: PortalPolicy,
    // take the client ip from X-Forwarded-For / X-Real-IP
    pub trust_proxy_headers: bool,
}
