pub struct Session {
    pub identity: Option<Identity>,
}

pub trait CredentialStore {
    async fn load(&self) -> Option<Credential>;
    async fn save(&self, credential: &Credential);
    async fn clear(&self);
}

// the interactive flow has to be swappable: real hosted page on device,
// a fabricated credential in the simulator where no browser exists

pub trait InteractiveAuthorizer {
    async fn authorize(&self, scopes: &[String]) -> Result<Credential, ()>;
}

// Manager owns the one Session for the process. check_session on startup
// recovers whatever the store has; login/logout mutate. UI subscribes and
// routes on is_authenticated. Open point: second login() while one is in
// flight - queue it or coalesce onto the running attempt? Leaning coalesce,
// two interactive prompts at once would be nonsense anyway.
pub struct SessionManager {}

impl SessionManager {
    pub async fn check_session(&self) -> Session {}
    pub async fn login(&self) -> Result<Session, ()> {}
    pub async fn logout(&self) -> Session {}
    pub fn is_authenticated(&self) -> bool {}
}
