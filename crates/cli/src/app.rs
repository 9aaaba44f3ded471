use crate::command;
use anyhow::Result;
use clap::Parser;
use grip_config::{load_config, Config, LoadedConfig};
use grip_core::{
    AssetManager, Auth, DirectoryReader, GitHubRenderer, HttpFetcher, OfflineRenderer,
    ReadmeReader, ReadmeRenderer, StdinReader, Theme, VERSION,
};
use grip_server::{Grip, GripOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn parse_theme(theme: &str) -> Result<Theme, String> {
    theme.parse()
}

/// Render local readme files before sending off to GitHub.
#[derive(Parser, Debug, Clone)]
#[clap(name = "grip", version)]
pub struct Args {
    /// A file to render or a directory containing README.md, `-` for stdin.
    pub path: Option<String>,

    /// What to listen on, of the form `<host>[:<port>]` or just `<port>`.
    ///
    /// With `--export`, the output file instead (`-` for stdout).
    pub address: Option<String>,

    /// Render as user-content like comments or issues.
    #[clap(long)]
    pub user_content: bool,

    /// The repository context, only taken into account with `--user-content`.
    #[clap(long, value_name = "REPO")]
    pub context: Option<String>,

    /// A GitHub username for API authentication.
    ///
    /// The password is prompted for when `--pass` is not given.
    #[clap(long, value_name = "USERNAME")]
    pub user: Option<String>,

    /// A GitHub password or auth token for API authentication.
    #[clap(long, value_name = "PASSWORD")]
    pub pass: Option<String>,

    /// Render wide, i.e. when the side nav is collapsed.
    #[clap(long)]
    pub wide: bool,

    /// Clear the cached styles and assets and exit.
    #[clap(long)]
    pub clear: bool,

    /// Export to `<path>.html` instead of serving, optionally using ADDRESS as the
    /// output file.
    #[clap(long)]
    pub export: bool,

    /// Link to styles instead of inlining them when exporting.
    #[clap(long)]
    pub no_inline: bool,

    /// Open a tab in the browser after the server starts.
    #[clap(short = 'b', long)]
    pub browser: bool,

    /// Base URL of the GitHub API, e.g. that of a GitHub Enterprise instance.
    #[clap(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Set the page title, the filename by default.
    #[clap(long)]
    pub title: Option<String>,

    /// Do not refresh the Readme content when the file changes.
    #[clap(long)]
    pub norefresh: bool,

    /// Do not print to the terminal.
    #[clap(long)]
    pub quiet: bool,

    /// Theme of the page, `light` or `dark`.
    #[clap(long, default_value = "light", value_parser = parse_theme)]
    pub theme: Theme,

    /// Render locally instead of calling the GitHub API.
    #[clap(long)]
    pub offline: bool,

    /// Write the log to this file instead of stderr.
    #[clap(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Specify the path of the config file.
    #[clap(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,
}

impl Args {
    pub async fn run(self) -> Result<()> {
        let LoadedConfig {
            config,
            file_path,
            file_found,
            maybe_error,
        } = load_config(self.config_file.clone());

        let quiet = self.quiet || config.quiet;
        let log_file = self
            .log
            .clone()
            .or_else(|| config.log.log_file.as_ref().map(PathBuf::from));
        let max_level = if config.debug {
            "debug"
        } else {
            &config.log.max_level
        };
        let _guard = crate::logging::init(log_file, max_level, quiet)?;

        if !file_found {
            tracing::debug!(path = %file_path.display(), "No settings file loaded");
        }

        if let Some(err) = maybe_error {
            tracing::warn!(path = %file_path.display(), %err, "Invalid settings, using the defaults");
        }

        if self.clear {
            return command::clear::run(&config);
        }

        if self.export {
            command::export::run(&self, &config).await
        } else {
            command::serve::run(&self, &config).await
        }
    }

    pub(crate) fn is_stdin(&self) -> bool {
        self.path.as_deref() == Some("-")
    }

    /// Credentials from the command line, falling back to the settings.
    fn auth(&self, config: &Config) -> Result<Option<Auth>> {
        self.auth_with(config, prompt_password)
    }

    /// `prompt` asks for the password when only `--user` is known.
    fn auth_with(
        &self,
        config: &Config,
        prompt: impl FnOnce() -> std::io::Result<String>,
    ) -> Result<Option<Auth>> {
        let username = self.user.clone().or_else(|| config.username.clone());
        let mut password = self.pass.clone().or_else(|| config.password.clone());

        if self.user.is_some() && password.is_none() {
            password = Some(prompt()?);
        }

        Ok(match (username, password) {
            (None, None) => None,
            (username, password) => Some(Auth::new(
                username.unwrap_or_default(),
                password.unwrap_or_default(),
            )),
        })
    }

    pub(crate) fn reader(&self, path: Option<&str>) -> Result<Arc<dyn ReadmeReader>> {
        if self.is_stdin() {
            return Ok(Arc::new(StdinReader::new(None)));
        }
        Ok(Arc::new(DirectoryReader::new(path.map(Path::new), false)?))
    }

    fn renderer(&self, config: &Config) -> Arc<dyn ReadmeRenderer> {
        if self.offline {
            return Arc::new(OfflineRenderer::new(self.user_content));
        }
        Arc::new(GitHubRenderer::new(
            self.user_content,
            self.context.clone(),
            self.api_url.clone().or_else(|| config.api_url.clone()),
        ))
    }

    /// Builds the app serving `reader`.
    pub(crate) fn grip(
        &self,
        config: &Config,
        reader: Arc<dyn ReadmeReader>,
        autorefresh: bool,
        render_inline: bool,
    ) -> Result<Grip> {
        let assets = AssetManager::new(
            config.cache_path(VERSION),
            config.style_urls.clone(),
            Arc::new(HttpFetcher::default()),
        );

        let options = GripOptions {
            autorefresh,
            quiet: self.quiet || config.quiet,
            render_wide: self.wide,
            render_inline,
            title: self.title.clone(),
            theme: self.theme,
            auth: self.auth(config)?,
            ..Default::default()
        };

        Ok(Grip::new(reader, self.renderer(config), assets, options))
    }
}

/// Reads the password from the terminal without echoing it.
fn prompt_password() -> std::io::Result<String> {
    rpassword::prompt_password("Password: ")
}
