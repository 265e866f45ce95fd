// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Line-driven presentation of a campus map session.
//!
//! Renders the building list and map state as text over a [`HeadlessMap`],
//! and turns typed commands into the same hooks a graphical front end would
//! call. A background ticker advances camera animations in real time.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use campus_map::{
    match_count, Availability, Building, CampusError, CampusMap, HeadlessMap, MapEngine,
    MapHandle, Room, SelectionEvent, Snapshot, Transition,
};
use chrono::{Local, NaiveTime};
use log::{debug, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Animation frame interval (~60 fps)
const FRAME: Duration = Duration::from_millis(16);

const HELP: &str = "\
commands:
  list               show the building list
  select <id>        select a building from the list
  click <id>         click a building's map marker
  search [query]     filter rooms by number (empty clears)
  room <id>          focus the camera on a search result
  clear              clear the selection
  pan <dlng> <dlat>  drag the map
  status             show camera and selection state
  help               show this text
  quit               exit";

/// A parsed shell command
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    List,
    Select(String),
    Click(String),
    Search(String),
    Room(String),
    Clear,
    Pan { d_lng: f64, d_lat: f64 },
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse one input line.
    ///
    /// The search query is taken verbatim after the first space.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (word, rest) = line.trim_start().split_once(' ').unwrap_or((line.trim(), ""));

        let id = |name: &str| {
            let id = rest.trim();
            if id.is_empty() {
                Err(format!("usage: {name} <building id>"))
            } else {
                Ok(id.to_string())
            }
        };

        match word {
            "list" | "ls" => Ok(Self::List),
            "select" => id("select").map(Self::Select),
            "click" => id("click").map(Self::Click),
            "search" | "/" => Ok(Self::Search(rest.to_string())),
            "room" => id("room").map(Self::Room),
            "clear" => Ok(Self::Clear),
            "pan" => {
                let mut parts = rest.split_whitespace().map(str::parse::<f64>);
                match (parts.next(), parts.next()) {
                    (Some(Ok(d_lng)), Some(Ok(d_lat))) => Ok(Self::Pan { d_lng, d_lat }),
                    _ => Err("usage: pan <dlng> <dlat>".to_string()),
                }
            }
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            "" => Err(String::new()),
            other => Err(format!("unknown command '{other}', try 'help'")),
        }
    }
}

/// Advances map animations on a background task until shut down.
pub struct AnimationTicker {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for AnimationTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationTicker")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl AnimationTicker {
    #[must_use]
    pub fn spawn(map: MapHandle<HeadlessMap>, frame: Duration) -> Self {
        let cancel_token = CancellationToken::new();
        let task_cancel = cancel_token.clone();
        let handle = tokio::spawn(async move {
            tick_loop(map, frame, task_cancel).await;
        });
        Self {
            cancel_token,
            handle,
        }
    }

    /// Stop the ticker and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for AnimationTicker {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn tick_loop(
    map: MapHandle<HeadlessMap>,
    frame: Duration,
    cancel_token: CancellationToken,
) {
    let mut interval = tokio::time::interval(frame);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if map.with_mut(|m| m.advance(frame)).is_none() {
                    info!("Map released, animation ticker stopping");
                    return;
                }
            }
            () = cancel_token.cancelled() => {
                debug!("Animation ticker cancelled");
                return;
            }
        }
    }
}

fn status_label(status: Availability) -> &'static str {
    match status {
        Availability::Available => "available",
        Availability::Unavailable => "unavailable",
        Availability::Upcoming => "upcoming",
        Availability::Unknown => "unknown",
    }
}

fn rooms_by_floor(rooms: &[Room]) -> BTreeMap<u32, Vec<&Room>> {
    let mut floors: BTreeMap<u32, Vec<&Room>> = BTreeMap::new();
    for room in rooms {
        floors.entry(room.floor).or_default().push(room);
    }
    floors
}

fn render_building(out: &mut String, building: &Building, active: bool, now: NaiveTime) {
    let _ = write!(
        out,
        "{} {:<5} {} [{}]",
        if active { '>' } else { ' ' },
        building.id,
        building.name,
        status_label(building.status)
    );
    if let Some(km) = building.distance_km {
        let _ = write!(out, " {km:.2} km");
    }
    out.push('\n');

    if building.rooms.is_empty() {
        out.push_str("      No room information.\n");
        return;
    }
    for (floor, rooms) in rooms_by_floor(&building.rooms) {
        let labels: Vec<String> = rooms
            .iter()
            .map(|room| {
                let mut label = room.number.clone();
                if room.is_open_at(now) {
                    label.push_str(" (open)");
                }
                label
            })
            .collect();
        if floor == 0 {
            let _ = writeln!(out, "      {}", labels.join(", "));
        } else {
            let _ = writeln!(out, "      floor {floor}: {}", labels.join(", "));
        }
    }
}

/// Render the building list the way the side panel shows it.
#[must_use]
pub fn render_list(snapshot: &Snapshot<'_>, now: NaiveTime) -> String {
    if snapshot.loading {
        return "Loading campus data...".to_string();
    }
    if let Some(error) = snapshot.load_error {
        return format!("Failed to load campus data: {error}");
    }
    if snapshot.no_results() {
        return format!("No rooms match \"{}\".", snapshot.search_query);
    }

    let mut out = String::new();
    for building in snapshot.effective_buildings.iter() {
        let active = snapshot.active_building_id == Some(building.id.as_str());
        render_building(&mut out, building, active, now);
    }
    out.trim_end().to_string()
}

/// Render the list under a one-line summary of the active search.
#[must_use]
pub fn render_search(session: &CampusMap<HeadlessMap>, now: NaiveTime) -> String {
    let snapshot = session.snapshot();
    let list = render_list(&snapshot, now);
    if snapshot.search_query.is_empty()
        || snapshot.loading
        || snapshot.load_error.is_some()
        || snapshot.no_results()
    {
        return list;
    }
    let rooms = match_count(session.coordinator().buildings(), snapshot.search_query);
    format!(
        "{rooms} matching room{} in {} building{}\n{list}",
        if rooms == 1 { "" } else { "s" },
        snapshot.effective_buildings.len(),
        if snapshot.effective_buildings.len() == 1 { "" } else { "s" },
    )
}

/// Render camera and selection state.
#[must_use]
pub fn render_status(session: &CampusMap<HeadlessMap>) -> String {
    let snapshot = session.snapshot();
    let mut out = String::new();

    match session.map().and_then(|m| m.with(|e| (e.camera(), e.is_moving()))) {
        Some((camera, moving)) => {
            let _ = writeln!(
                out,
                "camera {} zoom {:.1} pitch {:.0} bearing {:.0}{}",
                camera.center,
                camera.zoom,
                camera.pitch,
                camera.bearing,
                if moving { " (moving)" } else { "" }
            );
        }
        None => out.push_str("map unavailable\n"),
    }
    let _ = writeln!(out, "active: {}", snapshot.active_building_id.unwrap_or("-"));
    let _ = writeln!(out, "search: {:?}", snapshot.search_query);
    match snapshot.user_position {
        Some(position) => {
            let _ = write!(out, "you: {position}");
        }
        None => out.push_str("you: unknown"),
    }
    out
}

fn describe(transition: Option<Transition>) -> &'static str {
    match transition {
        Some(Transition::Jump) => "camera jumped",
        Some(Transition::Fly(_)) => "camera flying",
        Some(Transition::Stay) => "camera already there",
        None => "camera unavailable",
    }
}

/// Apply a command to the session and return the text to print.
pub fn execute(
    session: &mut CampusMap<HeadlessMap>,
    command: &ShellCommand,
) -> Result<String, CampusError> {
    let now = Local::now().time();
    Ok(match command {
        ShellCommand::List => render_list(&session.snapshot(), now),
        ShellCommand::Select(id) => {
            let transition = session.on_list_select(id)?;
            format!("selected {id}, {}", describe(transition))
        }
        ShellCommand::Click(id) => {
            let marker = session.markers().and_then(|m| m.marker_for(id));
            let clicked = match (marker, session.map()) {
                (Some(marker), Some(map)) => map.with(|m| m.click(marker)).unwrap_or(false),
                _ => false,
            };
            if !clicked {
                return Ok(format!("no marker for {id} on the map"));
            }
            session.process_clicks();
            format!("clicked marker {id}")
        }
        ShellCommand::Search(query) => {
            session.on_search_input(query);
            render_search(session, now)
        }
        ShellCommand::Room(id) => {
            let transition = session.on_room_result_click(id)?;
            format!("focused {id}, {}", describe(transition))
        }
        ShellCommand::Clear => {
            session.clear_selection();
            "selection cleared".to_string()
        }
        ShellCommand::Pan { d_lng, d_lat } => {
            match session.map().and_then(|m| m.with_mut(|e| e.pan_by(*d_lng, *d_lat))) {
                Some(()) => "map moved".to_string(),
                None => "map unavailable".to_string(),
            }
        }
        ShellCommand::Status => render_status(session),
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::Quit => String::new(),
    })
}

/// Turn pending selection events into user-visible notices.
pub fn drain_events(events: &mut broadcast::Receiver<SelectionEvent>) -> Vec<String> {
    let mut notices = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SelectionEvent::SelectionChanged(Some(id)) = event {
            notices.push(format!("(list scrolled to {id})"));
        }
    }
    notices
}

/// Run the interactive shell on stdin until `quit` or end of input.
pub async fn run(mut session: CampusMap<HeadlessMap>) -> std::io::Result<()> {
    let ticker = session.map().cloned().map(|map| AnimationTicker::spawn(map, FRAME));
    let mut events = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", render_list(&session.snapshot(), Local::now().time()));
    println!("type 'help' for commands");

    while let Some(line) = lines.next_line().await? {
        match ShellCommand::parse(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => match execute(&mut session, &command) {
                Ok(output) => println!("{output}"),
                Err(e) => println!("error: {e}"),
            },
            Err(message) if message.is_empty() => {}
            Err(message) => println!("{message}"),
        }
        for notice in drain_events(&mut events) {
            println!("{notice}");
        }
    }

    if let Some(ticker) = ticker {
        ticker.shutdown().await;
    }
    session.unmount();
    Ok(())
}
