//! Line-oriented terminal front end.
//!
//! Three screens addressed like the app routes: `playlist`,
//! `player/{index}` and `details/{index}`. Navigation keeps a back stack
//! whose bottom is always the playlist.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use accatalog::Catalog;
use acplayer::PlaybackController;
use acplayer::time_utils::{format_mmss, parse_time_flexible, seconds_to_ms};
use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

const PROGRESS_WIDTH: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Playlist,
    Player(usize),
    Details(usize),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Playlist => write!(f, "playlist"),
            Route::Player(index) => write!(f, "player/{}", index),
            Route::Details(index) => write!(f, "details/{}", index),
        }
    }
}

impl FromStr for Route {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_matches('/');
        if s == "playlist" {
            return Ok(Route::Playlist);
        }
        let (screen, index) = s
            .split_once('/')
            .ok_or_else(|| anyhow!("Unknown route '{}'", s))?;
        let index: usize = index
            .parse()
            .with_context(|| format!("Invalid book index in route '{}'", s))?;
        match screen {
            "player" => Ok(Route::Player(index)),
            "details" => Ok(Route::Details(index)),
            _ => bail!("Unknown route '{}'", s),
        }
    }
}

/// Where a seek command should land.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeekTarget {
    Fraction(f32),
    Seconds(u64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    List,
    Open(usize),
    Player,
    Details(Option<usize>),
    Go(Route),
    Back,
    Toggle,
    Pause,
    Resume,
    Seek(SeekTarget),
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or("status").to_lowercase();
        let arg = words.next();

        let index = |arg: Option<&str>| -> Result<usize> {
            arg.ok_or_else(|| anyhow!("'{}' needs a book number", verb))?
                .parse::<usize>()
                .with_context(|| format!("'{}' needs a book number", verb))
        };

        let command = match verb.as_str() {
            "list" | "l" | "ls" => Command::List,
            "open" | "o" | "play" => Command::Open(index(arg)?),
            "player" => Command::Player,
            "details" | "d" => match arg {
                Some(_) => Command::Details(Some(index(arg)?)),
                None => Command::Details(None),
            },
            "go" => Command::Go(arg.ok_or_else(|| anyhow!("'go' needs a route"))?.parse()?),
            "back" | "b" => Command::Back,
            "toggle" | "t" | "p" => Command::Toggle,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "seek" | "s" => {
                let position = arg.ok_or_else(|| anyhow!("'seek' needs a position"))?;
                Command::Seek(parse_seek(position)?)
            }
            "status" | "" => Command::Status,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => bail!("Unknown command '{}' (type 'help')", other),
        };
        Ok(command)
    }
}

/// `0.5`, `50%` or a time such as `05:00`.
fn parse_seek(arg: &str) -> Result<SeekTarget> {
    if let Some(percent) = arg.strip_suffix('%') {
        let value: f32 = percent
            .parse()
            .with_context(|| format!("Invalid percentage '{}'", arg))?;
        return Ok(SeekTarget::Fraction(value / 100.0));
    }
    if arg.contains(':') {
        return Ok(SeekTarget::Seconds(parse_time_flexible(arg)?));
    }
    let value: f32 = arg
        .parse()
        .with_context(|| format!("Invalid seek position '{}'", arg))?;
    Ok(SeekTarget::Fraction(value))
}

const HELP: &str = "\
Commands:
  list                 show the catalog
  open N               play book N and show the player
  player               show the player for the current book
  details [N]          show the details of book N (or of the shown book)
  go ROUTE             navigate to playlist, player/N or details/N
  back                 previous screen
  toggle               play/pause
  pause | resume
  seek F|P%|MM:SS      move the playhead (fraction, percent or time)
  status               redraw the current screen
  quit";

pub enum Flow {
    Continue,
    Quit,
}

pub struct Ui<'a, W: Write> {
    catalog: &'a Catalog,
    controller: &'a PlaybackController,
    out: W,
    stack: Vec<Route>,
}

impl<'a, W: Write> Ui<'a, W> {
    pub fn new(catalog: &'a Catalog, controller: &'a PlaybackController, out: W) -> Self {
        Self {
            catalog,
            controller,
            out,
            stack: vec![Route::Playlist],
        }
    }

    pub fn route(&self) -> Route {
        self.stack.last().copied().unwrap_or(Route::Playlist)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Parses and runs one input line, then redraws.
    pub fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match line.parse::<Command>() {
            Ok(command) => self.handle(command),
            Err(err) => {
                self.report(&err)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn report(&mut self, err: &anyhow::Error) -> Result<()> {
        writeln!(self.out, "! {:#}", err)?;
        Ok(())
    }

    pub fn handle(&mut self, command: Command) -> Result<Flow> {
        debug!(?command, route = %self.route(), "UI command");
        match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => {
                writeln!(self.out, "{}", HELP)?;
                return Ok(Flow::Continue);
            }
            Command::List => self.stack.truncate(1),
            Command::Open(index) => {
                let item = self.catalog.get(index)?;
                if let Err(err) = self.controller.play(item) {
                    writeln!(self.out, "! {}", err)?;
                }
                self.navigate(Route::Player(index));
            }
            Command::Player => match self.current_index() {
                Some(index) => self.navigate(Route::Player(index)),
                None => writeln!(self.out, "! Nothing is playing")?,
            },
            Command::Details(index) => {
                let index = match (index, self.route()) {
                    (Some(index), _) => Some(index),
                    (None, Route::Player(index) | Route::Details(index)) => Some(index),
                    (None, Route::Playlist) => self.current_index(),
                };
                match index {
                    Some(index) => {
                        self.catalog.get(index)?;
                        self.navigate(Route::Details(index));
                    }
                    None => writeln!(self.out, "! Which book? (details N)")?,
                }
            }
            Command::Go(route) => {
                if let Route::Player(index) | Route::Details(index) = route {
                    self.catalog.get(index)?;
                }
                if route == Route::Playlist {
                    self.stack.truncate(1);
                } else {
                    self.navigate(route);
                }
            }
            Command::Back => {
                if self.stack.len() > 1 {
                    self.stack.pop();
                }
            }
            Command::Toggle => match self.route() {
                // The player screen button plays its own book
                Route::Player(index) => {
                    let item = self.catalog.get(index)?;
                    if let Err(err) = self.controller.toggle(item) {
                        writeln!(self.out, "! {}", err)?;
                    }
                }
                _ => self.controller.toggle_current(),
            },
            Command::Pause => self.controller.pause(),
            Command::Resume => self.controller.resume(),
            Command::Seek(target) => self.seek(target),
            Command::Status => {}
        }

        self.render()?;
        Ok(Flow::Continue)
    }

    fn navigate(&mut self, route: Route) {
        if self.route() != route {
            self.stack.push(route);
        }
    }

    fn current_index(&self) -> Option<usize> {
        let item = self.controller.current_item().get()?;
        self.catalog.index_of(&item)
    }

    fn seek(&self, target: SeekTarget) {
        let fraction = match target {
            SeekTarget::Fraction(fraction) => fraction,
            SeekTarget::Seconds(seconds) => {
                let duration_ms = self.controller.duration_ms().get();
                if duration_ms == 0 {
                    0.0
                } else {
                    (seconds_to_ms(seconds) as f64 / duration_ms as f64) as f32
                }
            }
        };
        self.controller.seek_to(fraction);
    }

    pub fn render(&mut self) -> Result<()> {
        match self.route() {
            Route::Playlist => self.render_playlist(),
            Route::Player(index) => self.render_player(index),
            Route::Details(index) => self.render_details(index),
        }
    }

    /// One-line notice for changes nobody asked for (end of a book).
    pub fn notify_stopped(&mut self) -> Result<()> {
        let state = self.controller.snapshot();
        if let Some(item) = state.current_item.filter(|_| !state.is_playing) {
            writeln!(self.out, "■ Finished or stopped: {}", item)?;
        }
        Ok(())
    }

    fn render_playlist(&mut self) -> Result<()> {
        let state = self.controller.snapshot();
        writeln!(self.out, "== AudioCloud ==")?;
        for (index, item) in self.catalog.iter().enumerate() {
            let marker = if state.current_item.as_ref() == Some(item) {
                '*'
            } else {
                ' '
            };
            writeln!(self.out, "{} [{}] {}", marker, index, item.title)?;
            writeln!(self.out, "      {}", item.author)?;
        }

        // Mini player
        if let Some(item) = &state.current_item {
            let icon = if state.is_playing { "▶" } else { "⏸" };
            writeln!(self.out, "---")?;
            writeln!(self.out, "{} {} by {}  (player)", icon, item.title, item.author)?;
        }
        Ok(())
    }

    fn render_player(&mut self, index: usize) -> Result<()> {
        let item = self.catalog.get(index)?;
        let state = self.controller.snapshot();
        writeln!(self.out, "== {} ==", item.title)?;
        writeln!(self.out, "by {}", item.author)?;
        writeln!(self.out, "cover: {}", item.cover_image_ref)?;

        if state.current_item.as_ref() == Some(item) {
            let filled = (state.progress() * PROGRESS_WIDTH as f32).round() as usize;
            writeln!(
                self.out,
                "[{}{}]",
                "#".repeat(filled),
                "-".repeat(PROGRESS_WIDTH - filled.min(PROGRESS_WIDTH))
            )?;
            writeln!(
                self.out,
                "{} / {}   {}",
                format_mmss(state.position_ms),
                format_mmss(state.duration_ms),
                if state.is_playing { "Playing" } else { "Paused" }
            )?;
        } else {
            writeln!(self.out, "[{}]", "-".repeat(PROGRESS_WIDTH))?;
            writeln!(self.out, "00:00 / 00:00   Stopped")?;
        }

        if let Some(err) = &state.last_error {
            writeln!(self.out, "! {} (toggle to retry)", err)?;
        }
        writeln!(self.out, "(details, toggle, seek, back)")?;
        Ok(())
    }

    fn render_details(&mut self, index: usize) -> Result<()> {
        let item = self.catalog.get(index)?;
        writeln!(self.out, "== {} ==", item.title)?;
        writeln!(self.out, "Author: {}", item.author)?;
        writeln!(self.out, "Cover:  {}", item.cover_image_ref)?;
        writeln!(self.out)?;
        writeln!(self.out, "{}", item.summary)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use acplayer::SimulatedBackend;

    use super::*;

    fn fixture() -> (Catalog, PlaybackController) {
        let catalog = Catalog::embedded().unwrap();
        let backend = SimulatedBackend::manual().with_catalog(&catalog);
        let controller = PlaybackController::new(Arc::new(backend));
        (catalog, controller)
    }

    fn output(ui: Ui<'_, Vec<u8>>) -> String {
        String::from_utf8(ui.into_inner()).unwrap()
    }

    #[test]
    fn test_route_parsing() {
        assert_eq!("playlist".parse::<Route>().unwrap(), Route::Playlist);
        assert_eq!("player/3".parse::<Route>().unwrap(), Route::Player(3));
        assert_eq!("/details/0".parse::<Route>().unwrap(), Route::Details(0));
        assert!("player/x".parse::<Route>().is_err());
        assert!("settings/1".parse::<Route>().is_err());
        assert!("player".parse::<Route>().is_err());
    }

    #[test]
    fn test_route_display_roundtrip() {
        for route in [Route::Playlist, Route::Player(2), Route::Details(4)] {
            assert_eq!(route.to_string().parse::<Route>().unwrap(), route);
        }
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!("open 2".parse::<Command>().unwrap(), Command::Open(2));
        assert_eq!("details".parse::<Command>().unwrap(), Command::Details(None));
        assert_eq!(
            "seek 50%".parse::<Command>().unwrap(),
            Command::Seek(SeekTarget::Fraction(0.5))
        );
        assert_eq!(
            "seek 02:30".parse::<Command>().unwrap(),
            Command::Seek(SeekTarget::Seconds(150))
        );
        assert_eq!(
            "go details/1".parse::<Command>().unwrap(),
            Command::Go(Route::Details(1))
        );
        assert_eq!("".parse::<Command>().unwrap(), Command::Status);
        assert!("open".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }

    #[test]
    fn test_open_plays_and_shows_player() {
        let (catalog, controller) = fixture();
        let mut ui = Ui::new(&catalog, &controller, Vec::new());

        ui.handle_line("open 0").unwrap();
        assert_eq!(ui.route(), Route::Player(0));
        assert!(controller.is_playing().get());

        ui.handle_line("seek 0.5").unwrap();
        ui.handle_line("toggle").unwrap();
        assert!(!controller.is_playing().get());

        let text = output(ui);
        assert!(text.contains("== The Adventures of Sherlock Holmes =="));
        assert!(text.contains("05:00 / 10:00   Paused"));
        controller.dispose();
    }

    #[test]
    fn test_huge_seek_time_lands_at_end() {
        let (catalog, controller) = fixture();
        let mut ui = Ui::new(&catalog, &controller, Vec::new());

        ui.handle_line("open 0").unwrap();
        ui.handle_line("pause").unwrap();
        ui.handle_line("seek 0:99999999999999999").unwrap();
        assert_eq!(controller.position_ms().get(), controller.duration_ms().get());

        ui.handle_line("seek 18446744073709551615:00").unwrap();
        assert_eq!(controller.position_ms().get(), controller.duration_ms().get());

        let text = output(ui);
        assert!(text.contains("! Invalid time format: Time '18446744073709551615:00' is out of range"));
        controller.dispose();
    }

    #[test]
    fn test_back_stack() {
        let (catalog, controller) = fixture();
        let mut ui = Ui::new(&catalog, &controller, Vec::new());

        ui.handle_line("open 1").unwrap();
        ui.handle_line("details").unwrap();
        assert_eq!(ui.route(), Route::Details(1));

        ui.handle_line("back").unwrap();
        assert_eq!(ui.route(), Route::Player(1));
        ui.handle_line("back").unwrap();
        ui.handle_line("back").unwrap();
        assert_eq!(ui.route(), Route::Playlist);

        let text = output(ui);
        assert!(text.contains("Author: Jane Austen"));
        assert!(text.contains("▶ Pride and Prejudice by Jane Austen"));
    }

    #[test]
    fn test_mini_player_opens_current_book() {
        let (catalog, controller) = fixture();
        let mut ui = Ui::new(&catalog, &controller, Vec::new());

        ui.handle_line("player").unwrap();
        assert_eq!(ui.route(), Route::Playlist);

        ui.handle_line("open 4").unwrap();
        ui.handle_line("list").unwrap();
        ui.handle_line("player").unwrap();
        assert_eq!(ui.route(), Route::Player(4));
    }

    #[test]
    fn test_out_of_range_book_is_reported() {
        let (catalog, controller) = fixture();
        let mut ui = Ui::new(&catalog, &controller, Vec::new());

        assert!(ui.handle_line("open 42").is_err());
        assert_eq!(ui.route(), Route::Playlist);
        assert!(controller.current_item().get().is_none());
    }
}
