// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use billed_app::UserType;
use billed_db::LocalStorage;
use billed_store::Client;
use config::Config;
use runtime::CliRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `billed --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = config.db_path()?;
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    logging::init(&billed_db::default_log_dir()?)?;

    let storage = LocalStorage::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or BILLED_DB_PATH",
            db_path.display()
        )
    })?;
    storage.bootstrap()?;

    if options.logout {
        storage.logout()?;
        println!("signed out");
        return Ok(());
    }

    let mut client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;

    if let Some(login) = &options.login {
        let user_type = if login.admin {
            UserType::Admin
        } else {
            UserType::Employee
        };
        sign_in_interactively(&client, &storage, login, user_type)?;
    }
    client = client.with_token(storage.jwt()?);

    let session = storage.current_user()?;
    if options.check_only {
        return Ok(());
    }

    let session = session.ok_or_else(|| {
        anyhow!("nobody is signed in; run `billed --login <email> --password <password>` first")
    })?;
    let settings = config.dashboard_settings(&session);
    info!(
        email = %session.email,
        user_type = session.user_type.as_str(),
        base_url = client.base_url(),
        "launching"
    );

    let mut runtime = CliRuntime::new(client, session, settings);
    billed_tui::run_app(&mut runtime)
}

fn sign_in_interactively(
    client: &Client,
    storage: &LocalStorage,
    login: &LoginOptions,
    user_type: UserType,
) -> Result<()> {
    let user = runtime::sign_in(client, storage, &login.email, &login.password, user_type)?;
    println!("signed in as {} ({})", user.email, user.user_type.as_str());
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoginOptions {
    email: String,
    password: String,
    admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    print_example: bool,
    login: Option<LoginOptions>,
    logout: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        print_example: false,
        login: None,
        logout: false,
        check_only: false,
        show_help: false,
    };
    let mut email = None;
    let mut password = None;
    let mut admin = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--login" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--login requires an email address"))?;
                email = Some(value.as_ref().to_owned());
            }
            "--password" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--password requires a value"))?;
                password = Some(value.as_ref().to_owned());
            }
            "--admin" => {
                admin = true;
            }
            "--logout" => {
                options.logout = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    options.login = match (email, password) {
        (Some(email), Some(password)) => Some(LoginOptions {
            email,
            password,
            admin,
        }),
        (Some(_), None) => bail!("--login needs --password as well"),
        (None, Some(_)) => bail!("--password is only valid together with --login"),
        (None, None) if admin => bail!("--admin is only valid together with --login"),
        (None, None) => None,
    };
    if options.login.is_some() && options.logout {
        bail!("--login and --logout cannot be combined");
    }

    Ok(options)
}

fn print_help() {
    println!("billed");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --login <email>          Sign in (requires --password)");
    println!("  --password <password>    Password for --login");
    println!("  --admin                  Sign in as an administrator");
    println!("  --logout                 Forget the stored session");
    println!("  --check                  Validate config + DB + session, then exit");
    println!("  --help                   Show this help");
}
