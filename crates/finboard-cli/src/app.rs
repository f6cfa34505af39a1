//! Application state for one CLI invocation.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tracing::{debug, info, warn};

use finboard_core::auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore};
use finboard_core::models::Registration;
use finboard_core::{
    ApiClient, ApiError, AuthError, Config, GuardDecision, Outcome, Route, Router, Session,
    TokenBackend, TokenStore,
};

use crate::commands::{self, Command};

/// How many times a gated command may send the user back to sign in
/// before giving up.
const MAX_SIGN_IN_PROMPTS: usize = 3;

/// Source of interactive input.
pub trait Prompter {
    /// Ask for the login identifier; an empty answer falls back to `last`.
    fn identifier(&mut self, label: &str, last: Option<&str>) -> Result<String>;

    fn password(&mut self, prompt: &str) -> Result<String>;
}

/// Reads from the controlling terminal.
pub struct Terminal;

impl Prompter for Terminal {
    fn identifier(&mut self, label: &str, last: Option<&str>) -> Result<String> {
        let mut label = label.to_string();
        if let Some(first) = label.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        match last {
            Some(last) => print!("{} [{}]: ", label, last),
            None => print!("{}: ", label),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();
        if input.is_empty() {
            Ok(last.unwrap_or_default().to_string())
        } else {
            Ok(input.to_string())
        }
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        Ok(rpassword::prompt_password(prompt)?)
    }
}

pub struct App {
    config: Config,
    config_path: PathBuf,
    backend: TokenBackend,
    session: Session,
    api: ApiClient,
    router: Router,
    prompter: Box<dyn Prompter>,
}

fn token_store(config: &Config, backend: TokenBackend) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match backend {
        TokenBackend::File => Arc::new(FileTokenStore::new(config.data_dir()?)),
        // One keyring entry per server
        TokenBackend::Keyring => Arc::new(KeyringTokenStore::new(config.api_base.clone())),
        TokenBackend::Memory => Arc::new(MemoryTokenStore::new()),
    };
    Ok(store)
}

/// Turn an API failure into a user-facing error.
fn report(err: ApiError) -> anyhow::Error {
    match err.outcome() {
        Outcome::Validation | Outcome::Rejected => anyhow::Error::new(err),
        Outcome::Transport => anyhow::Error::new(err).context("Could not reach the finance server"),
    }
}

impl App {
    /// `config` is the effective configuration for this run; `config_path`
    /// is the file that only the remembered identifier is written back to.
    pub fn new(config: Config, config_path: PathBuf, ephemeral: bool) -> Result<Self> {
        let backend = if ephemeral {
            TokenBackend::Memory
        } else {
            config.token_backend
        };
        let store = token_store(&config, backend)?;
        let session = Session::new(config.api_config(), store)?;
        Ok(Self::with_session(config, config_path, backend, session))
    }

    fn with_session(
        config: Config,
        config_path: PathBuf,
        backend: TokenBackend,
        session: Session,
    ) -> Self {
        let state = session.hydrate();
        debug!(
            backend = ?backend,
            authenticated = state.authenticated,
            "Session hydrated"
        );

        let api = ApiClient::new(session.clone());
        let router = Router::new(session.clone());
        Self {
            config,
            config_path,
            backend,
            session,
            api,
            router,
            prompter: Box::new(Terminal),
        }
    }

    #[cfg(test)]
    fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match &command {
            Command::Login { identifier } => {
                if !self.sign_in(identifier.clone()).await? {
                    bail!("Login failed");
                }
                Ok(())
            }
            Command::Logout => {
                self.session.logout();
                println!("Signed out");
                Ok(())
            }
            Command::Status => {
                self.status();
                Ok(())
            }
            Command::Register {
                email,
                first_name,
                last_name,
            } => self.register(email, first_name, last_name).await,
            _ => self.open(&command).await,
        }
    }

    /// Navigate to the command's route and render it once the guard allows.
    async fn open(&mut self, command: &Command) -> Result<()> {
        let Some(location) = command.location() else {
            return Ok(());
        };
        let mut decision = self.router.navigate(location).clone();
        let mut prompts = 0;

        loop {
            match decision {
                GuardDecision::Pending => {
                    self.session.hydrate();
                    decision = self.router.on_session_change().clone();
                }
                GuardDecision::Redirect {
                    to: Route::Login, ..
                } => {
                    if prompts == MAX_SIGN_IN_PROMPTS {
                        bail!("Not signed in");
                    }
                    prompts += 1;
                    if self.sign_in(None).await? {
                        decision = self.router.after_login().clone();
                    }
                }
                GuardDecision::Redirect { to, .. } => {
                    decision = self.router.navigate(to).clone();
                }
                GuardDecision::Render(route) => {
                    debug!(route = route.title(), "Rendering");
                    match commands::execute(&self.api, command).await {
                        Ok(()) => return Ok(()),
                        // The refresh failed and the stored pair is gone
                        Err(e) if e.is_unauthorized() && !self.session.is_authenticated() => {
                            println!("Session expired, please sign in again.");
                            decision = self.router.on_session_change().clone();
                        }
                        Err(e) => return Err(report(e)),
                    }
                }
            }
        }
    }

    /// Prompt for credentials and log in. Returns `false` when the server
    /// refused them.
    async fn sign_in(&mut self, identifier: Option<String>) -> Result<bool> {
        let field = self.config.identifier_field;
        let identifier = match identifier {
            Some(id) => id,
            None => self
                .prompter
                .identifier(field.as_str(), self.config.last_identifier.as_deref())?,
        };
        if identifier.is_empty() {
            println!("A {} is required.", field);
            return Ok(false);
        }
        let password = self.prompter.password("Password: ")?;

        match self.session.login(&identifier, &password).await {
            Ok(()) => {
                info!(identifier = %identifier, "Signed in");
                self.remember_identifier(identifier);
                println!("Login successful!\n");
                Ok(true)
            }
            Err(AuthError::Rejected(message)) => {
                println!("{}", message);
                Ok(false)
            }
            Err(e) => Err(anyhow!(e).context("Login failed")),
        }
    }

    fn remember_identifier(&mut self, identifier: String) {
        if let Err(e) = Config::remember_identifier(&self.config_path, &identifier) {
            warn!(error = %e, "Failed to save config");
        }
        self.config.last_identifier = Some(identifier);
    }

    async fn register(&mut self, email: &str, first_name: &str, last_name: &str) -> Result<()> {
        let password = self.prompter.password("Password: ")?;
        let password2 = self.prompter.password("Confirm password: ")?;
        let registration = Registration {
            email: email.to_string(),
            password,
            password2,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };

        self.api.register(&registration).await.map_err(report)?;
        self.remember_identifier(email.to_string());
        println!("Account created. Run `finboard login` to sign in.");
        Ok(())
    }

    fn status(&self) {
        let state = self.session.state();
        println!("Server:   {}", self.config.api_base);
        println!("Storage:  {:?}", self.backend);
        match (&self.config.last_identifier, state.authenticated) {
            (Some(id), true) => println!("Session:  signed in as {}", id),
            (None, true) => println!("Session:  signed in"),
            (_, false) => println!("Session:  signed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CategoriesCommand;
    use finboard_core::auth::CredentialPair;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CATEGORIES: &str = "/api/finance/categories/";

    /// Answers every prompt with the same credentials and counts sign-ins.
    struct Scripted {
        identifier: &'static str,
        password: &'static str,
        sign_ins: Arc<AtomicUsize>,
    }

    impl Prompter for Scripted {
        fn identifier(&mut self, _label: &str, _last: Option<&str>) -> Result<String> {
            self.sign_ins.fetch_add(1, Ordering::SeqCst);
            Ok(self.identifier.to_string())
        }

        fn password(&mut self, _prompt: &str) -> Result<String> {
            Ok(self.password.to_string())
        }
    }

    fn scripted(password: &'static str) -> (Box<dyn Prompter>, Arc<AtomicUsize>) {
        let sign_ins = Arc::new(AtomicUsize::new(0));
        let prompter = Scripted {
            identifier: "sam",
            password,
            sign_ins: sign_ins.clone(),
        };
        (Box::new(prompter), sign_ins)
    }

    fn list_categories() -> Command {
        Command::Categories(CategoriesCommand::List { name: None })
    }

    fn app_with_store(
        server: &MockServer,
        config_path: PathBuf,
        pair: Option<CredentialPair>,
    ) -> App {
        let config = Config {
            api_base: server.uri(),
            ..Config::default()
        };
        let store = match pair {
            Some(pair) => MemoryTokenStore::with_pair(pair),
            None => MemoryTokenStore::new(),
        };
        let session = Session::with_client(
            config.api_config(),
            Arc::new(store),
            reqwest::Client::new(),
        );
        App::with_session(config, config_path, TokenBackend::Memory, session)
    }

    async fn mount_login(server: &MockServer, status: u16, calls: u64) {
        let template = if status == 200 {
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access": "acc-1", "refresh": "ref-1"}))
        } else {
            ResponseTemplate::new(status).set_body_json(serde_json::json!({
                "detail": "No active account found with the given credentials"
            }))
        };
        Mock::given(method("POST"))
            .and(path("/api/token/"))
            .and(body_json(serde_json::json!({"username": "sam", "password": "pw"})))
            .respond_with(template)
            .expect(calls)
            .mount(server)
            .await;
    }

    async fn mount_categories(server: &MockServer, token: &str, status: u16, calls: u64) {
        Mock::given(method("GET"))
            .and(path(CATEGORIES))
            .and(header("Authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!([])))
            .expect(calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_signed_out_command_prompts_then_resumes() {
        let server = MockServer::start().await;
        mount_login(&server, 200, 1).await;
        mount_categories(&server, "acc-1", 200, 1).await;

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let saved = Config {
            api_base: "https://saved.example".into(),
            ..Config::default()
        };
        saved.save_to(&config_path).unwrap();

        // Effective settings for this run: another server and no persistence
        let mut effective = Config::load_from(&config_path).unwrap();
        effective.api_base = server.uri();
        let (prompter, sign_ins) = scripted("pw");
        let mut app = App::new(effective, config_path.clone(), true)
            .unwrap()
            .with_prompter(prompter);

        app.run(list_categories()).await.unwrap();

        assert_eq!(sign_ins.load(Ordering::SeqCst), 1);
        assert_eq!(app.router.current().path, "/categories");
        assert!(app.session.is_authenticated());

        let reloaded = Config::load_from(&config_path).unwrap();
        assert_eq!(reloaded.last_identifier.as_deref(), Some("sam"));
        assert_eq!(reloaded.api_base, "https://saved.example");
        assert_eq!(reloaded.token_backend, TokenBackend::File);
    }

    #[tokio::test]
    async fn test_revoked_refresh_sends_user_back_through_sign_in() {
        let server = MockServer::start().await;
        mount_categories(&server, "acc-old", 401, 1).await;
        Mock::given(method("POST"))
            .and(path("/api/token/refresh/"))
            .and(body_json(serde_json::json!({"refresh": "ref-old"})))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        mount_login(&server, 200, 1).await;
        mount_categories(&server, "acc-1", 200, 1).await;

        let dir = tempfile::tempdir().unwrap();
        let (prompter, sign_ins) = scripted("pw");
        let mut app = app_with_store(
            &server,
            dir.path().join("config.json"),
            Some(CredentialPair::new("acc-old", "ref-old")),
        )
        .with_prompter(prompter);

        app.run(list_categories()).await.unwrap();

        assert_eq!(sign_ins.load(Ordering::SeqCst), 1);
        assert_eq!(app.router.current().path, "/categories");
        assert_eq!(app.session.access_token().as_deref(), Some("acc-1"));
    }

    #[tokio::test]
    async fn test_gives_up_after_repeated_rejections() {
        let server = MockServer::start().await;
        mount_login(&server, 401, MAX_SIGN_IN_PROMPTS as u64).await;
        mount_categories(&server, "acc-1", 200, 0).await;

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let (prompter, sign_ins) = scripted("pw");
        let mut app = app_with_store(&server, config_path.clone(), None).with_prompter(prompter);

        let err = app.run(list_categories()).await.unwrap_err();

        assert_eq!(err.to_string(), "Not signed in");
        assert_eq!(sign_ins.load(Ordering::SeqCst), MAX_SIGN_IN_PROMPTS);
        assert!(!app.session.is_authenticated());
        assert!(!config_path.exists());
    }
}
