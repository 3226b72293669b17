// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use billed_app::{DashboardSettings, SessionUser, UserType};
use billed_db::LocalStorage;
use billed_store::Client;
use tracing::info;

/// Runtime backed by the HTTP client and the signed-in session.
pub struct CliRuntime {
    client: Client,
    session: SessionUser,
    settings: DashboardSettings,
}

impl CliRuntime {
    pub fn new(client: Client, session: SessionUser, settings: DashboardSettings) -> Self {
        Self {
            client,
            session,
            settings,
        }
    }
}

impl billed_tui::AppRuntime for CliRuntime {
    type Store = Client;

    fn store(&self) -> Option<Client> {
        Some(self.client.clone())
    }

    fn session(&self) -> &SessionUser {
        &self.session
    }

    fn dashboard_settings(&self) -> DashboardSettings {
        self.settings.clone()
    }
}

/// Exchanges credentials for a token and records the session locally.
pub fn sign_in(
    client: &Client,
    storage: &LocalStorage,
    email: &str,
    password: &str,
    user_type: UserType,
) -> Result<SessionUser> {
    let token = client
        .login(email, password)
        .with_context(|| format!("sign in as {email}"))?;
    let user = SessionUser::connected(user_type, email);
    storage.set_jwt(&token)?;
    storage.set_current_user(&user)?;
    info!(%email, user_type = user_type.as_str(), "signed in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::{CliRuntime, sign_in};
    use anyhow::{Result, anyhow};
    use billed_app::{DashboardSettings, SessionUser, UserType};
    use billed_db::LocalStorage;
    use billed_store::Client;
    use billed_tui::AppRuntime;
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    #[test]
    fn sign_in_persists_token_and_user() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/auth/login");
            request
                .respond(
                    Response::from_string(r#"{"jwt":"signed-token"}"#).with_header(
                        Header::from_bytes("Content-Type", "application/json")
                            .expect("valid content type header"),
                    ),
                )
                .expect("response should succeed");
        });

        let client = Client::new(&addr, Duration::from_secs(1))?;
        let storage = LocalStorage::open_memory()?;
        storage.bootstrap()?;

        let user = sign_in(&client, &storage, "admin@test.tld", "admin", UserType::Admin)?;
        assert_eq!(user, SessionUser::connected(UserType::Admin, "admin@test.tld"));
        assert_eq!(storage.current_user()?, Some(user));
        assert_eq!(storage.jwt()?.as_deref(), Some("signed-token"));

        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn failed_sign_in_leaves_storage_untouched() -> Result<()> {
        let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))?;
        let storage = LocalStorage::open_memory()?;
        storage.bootstrap()?;

        let error = sign_in(&client, &storage, "a@a", "pw", UserType::Employee)
            .expect_err("unreachable back end should fail");
        assert!(format!("{error:#}").contains("sign in as a@a"));
        assert_eq!(storage.current_user()?, None);
        assert_eq!(storage.jwt()?, None);
        Ok(())
    }

    #[test]
    fn runtime_hands_out_store_and_session() -> Result<()> {
        let client = Client::new("http://localhost:5678", Duration::from_secs(1))?
            .with_token(Some("token".to_owned()));
        let session = SessionUser::connected(UserType::Employee, "a@a");
        let runtime = CliRuntime::new(client, session.clone(), DashboardSettings::default());

        assert_eq!(runtime.session(), &session);
        let store = runtime.store().expect("store expected");
        assert_eq!(store.token(), Some("token"));
        assert_eq!(runtime.dashboard_settings(), DashboardSettings::default());
        Ok(())
    }
}
