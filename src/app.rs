use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::{self, Config};
use crate::event::{Event, EventHandler, Toast};
use crate::gateway::{CacheStore, Gateway, GatewayConfig, GatewayEvent, GatewayMessage};
use crate::query::Mutation;
use crate::session::SessionStore;
use crate::stash::ai::AiClient;
use crate::stash::auth::AuthClient;
use crate::stash::client::StoreClient;
use crate::stash::keys::KeyStore;
use crate::stash::types::Identity;
use crate::stash::Credentials;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{ExploreView, LoginView, SettingsView, SnippetFormView, SnippetListView};

/// How long a toast stays up.
const TOAST_TTL: Duration = Duration::from_millis(2800);

/// Everything a view needs to talk to the outside world. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
  pub store: StoreClient,
  pub auth: AuthClient,
  pub ai: AiClient,
  pub keys: KeyStore,
  pub gateway: Gateway,
  pub tx: mpsc::UnboundedSender<Event>,
}

/// Main application: the view stack, the command palette and the
/// session lifecycle. One instance per running terminal.
pub struct App {
  config: Config,
  gateway: Gateway,
  ctx: AppContext,
  /// The identity the UI is currently painted for
  identity: Option<Identity>,
  /// Navigation stack - root is always at index 0
  views: Vec<Box<dyn View>>,
  command: CommandInput,
  toast: Option<(Toast, Instant)>,
  /// One-shot boot verification of the cached session
  verify: Mutation<Option<Identity>>,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let data_dir = config::data_dir()?;

    let cache = CacheStore::open(&data_dir.join("cache.db"))?;
    let gateway = Gateway::new(GatewayConfig::from_config(&config)?, cache)?;

    let sessions = SessionStore::new(&data_dir);
    let cached = sessions.load();
    let credentials = Credentials::new(cached.as_ref().map(|s| s.token.clone()));
    let keys = KeyStore::load(&data_dir);

    let store = StoreClient::new(gateway.clone(), &config.store.endpoint, credentials.clone())?;
    let auth = AuthClient::new(
      gateway.clone(),
      &config.store.endpoint,
      credentials,
      sessions,
    )?;
    let ai = AiClient::new(gateway.clone(), &config.ai.endpoint, &config.ai.model, keys.clone())?;

    // Placeholder sender; run() swaps in the live one before any view
    // is constructed
    let (tx, _rx) = mpsc::unbounded_channel();

    Ok(Self {
      config,
      gateway: gateway.clone(),
      ctx: AppContext {
        store,
        auth,
        ai,
        keys,
        gateway,
        tx,
      },
      identity: cached.map(|s| s.identity),
      views: Vec::new(),
      command: CommandInput::new(),
      toast: None,
      verify: Mutation::idle(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    self.ctx.tx = events.sender();

    // Gateway lifecycle runs in its own context: precache the shell
    // manifest, then purge stale generations and take control
    {
      let gateway = self.gateway.clone();
      tokio::spawn(async move {
        for event in [GatewayEvent::Install, GatewayEvent::Activate] {
          if let Err(e) = gateway.dispatch(event).await {
            warn!("gateway lifecycle failed: {}", e);
          }
        }
      });
    }

    // Optimistic boot: paint the cached identity immediately, then
    // verify it authoritatively exactly once
    self.views = vec![self.root_view()];
    let auth = self.ctx.auth.clone();
    self.verify.start(async move { auth.current_identity().await });

    if self.identity.is_some() {
      self.hydrate_keys();
    }

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn root_view(&self) -> Box<dyn View> {
    match self.identity.clone() {
      Some(identity) => Box::new(SnippetListView::new(self.ctx.clone(), identity)),
      None => Box::new(LoginView::new(self.ctx.auth.clone(), self.ctx.tx.clone())),
    }
  }

  fn hydrate_keys(&self) {
    let keys = self.ctx.keys.clone();
    let auth = self.ctx.auth.clone();
    tokio::spawn(async move {
      keys.hydrate(&auth).await;
    });
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.handle_tick(),
      Event::Notice(toast) => self.toast = Some((toast, Instant::now())),
      Event::StoreChanged => {
        // Server-side derived fields changed; every list refetches
        for view in &mut self.views {
          view.refresh();
        }
      }
      Event::LoggedIn(identity) => {
        self.identity = Some(identity);
        self.views = vec![self.root_view()];
        self.hydrate_keys();
      }
      Event::LoggedOut => {
        self.identity = None;
        self.ctx.keys.clear();
        self.views = vec![self.root_view()];
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    // The palette swallows input while open
    if self.command.is_active() {
      if let KeyResult::Event(CommandEvent::Submitted(command)) = self.command.handle_key(key) {
        self.execute_command(&command);
      }
      return;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.views.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::Unhandled,
    };

    match action {
      ViewAction::Unhandled => {
        if key.code == KeyCode::Char(':') {
          self.command.activate();
        }
      }
      other => self.apply_action(other),
    }
  }

  fn handle_tick(&mut self) {
    if let Some((_, shown_at)) = &self.toast {
      if shown_at.elapsed() > TOAST_TTL {
        self.toast = None;
      }
    }

    self.poll_verification();

    let action = match self.views.last_mut() {
      Some(view) => view.tick(),
      None => ViewAction::None,
    };
    self.apply_action(action);
  }

  /// Boot reconciliation: one shot, never retried.
  fn poll_verification(&mut self) {
    let Some(result) = self.verify.poll() else {
      return;
    };

    match result {
      Some(identity) => {
        if self.identity.is_none() {
          // Cold start: nothing was shown optimistically
          self.identity = Some(identity);
          self.views = vec![self.root_view()];
        }
        // Cached identity already painted: leave the shell alone
      }
      None => {
        if self.identity.is_some() {
          // Verification failed: force the unauthenticated view and
          // drop in-memory snippet state
          self.identity = None;
          self.views = vec![self.root_view()];
        }
      }
    }
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None | ViewAction::Unhandled => {}
      ViewAction::Push(view) => self.views.push(view),
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, command: &str) {
    match command {
      "snippets" => match self.identity.clone() {
        Some(identity) => {
          self.views = vec![Box::new(SnippetListView::new(self.ctx.clone(), identity))];
        }
        None => self.notify(Toast::error("Sign in first")),
      },
      "explore" => self.views.push(Box::new(ExploreView::new(self.ctx.clone()))),
      "new" => match self.identity.clone() {
        Some(identity) => {
          self
            .views
            .push(Box::new(SnippetFormView::create(self.ctx.clone(), identity)));
        }
        None => self.notify(Toast::error("Sign in first")),
      },
      "settings" => {
        if self.identity.is_some() {
          self.views.push(Box::new(SettingsView::new(self.ctx.clone())));
        } else {
          self.notify(Toast::error("Sign in first"));
        }
      }
      "update" => {
        // Re-install the shell generation, then skip waiting so the
        // cutover happens now
        let gateway = self.gateway.clone();
        let tx = self.ctx.tx.clone();
        tokio::spawn(async move {
          gateway.install().await;
          let toast = match gateway.handle_message(GatewayMessage::SkipWaiting) {
            Ok(()) => {
              tracing::info!("shell refreshed; gateway now {:?}", gateway.lifecycle());
              Toast::success("Shell cache refreshed")
            }
            Err(e) => {
              warn!("shell refresh failed: {}", e);
              Toast::error("Shell refresh failed")
            }
          };
          let _ = tx.send(Event::Notice(toast));
        });
      }
      "logout" => {
        let auth = self.ctx.auth.clone();
        let tx = self.ctx.tx.clone();
        tokio::spawn(async move {
          auth.logout().await;
          let _ = tx.send(Event::LoggedOut);
        });
      }
      "quit" => self.should_quit = true,
      "" => {}
      other => self.notify(Toast::error(format!("Unknown command: {}", other))),
    }
  }

  fn notify(&mut self, toast: Toast) {
    self.toast = Some((toast, Instant::now()));
  }

  // Accessors for rendering

  pub fn store_endpoint(&self) -> &str {
    &self.config.store.endpoint
  }

  pub fn identity(&self) -> Option<&Identity> {
    self.identity.as_ref()
  }

  pub fn breadcrumbs(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn current_shortcuts(&self) -> Vec<Shortcut> {
    self.views.last().map(|v| v.shortcuts()).unwrap_or_default()
  }

  pub fn toast(&self) -> Option<&Toast> {
    self.toast.as_ref().map(|(toast, _)| toast)
  }

  pub fn render_current_view(&mut self, frame: &mut Frame, area: Rect) {
    if let Some(view) = self.views.last_mut() {
      view.render(frame, area);
    }
  }

  pub fn render_command_overlay(&self, frame: &mut Frame, area: Rect) {
    self.command.render_overlay(frame, area);
  }
}
