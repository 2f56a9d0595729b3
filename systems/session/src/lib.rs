#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game state machine driving a room through its lifecycle.
//!
//! A [`Session`] is stateless: every operation takes the current
//! [`RoomState`], feeds commands through the world, and returns a
//! [`Transition`] carrying the next state and the events that produced it.
//! Randomness and wall-clock time are always supplied by the caller.

use std::time::Duration;

use maze_sabotage_core::{
    Command, Difficulty, Direction, Event, RoomState, SabotageEffect, SabotageKind, Timestamp,
};
use maze_sabotage_system_enemy_ai::EnemyAi;
use maze_sabotage_system_maze_generation::MazeGenerator;
use maze_sabotage_system_sabotage::{SabotageRejection, SabotageValidator};
use maze_sabotage_world::{self as world, World};
use rand::Rng;

/// Result of driving a room through one operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    /// Room state after the operation.
    pub state: RoomState,
    /// Events emitted while applying the operation, in order.
    pub events: Vec<Event>,
}

impl Transition {
    /// Reports whether the operation left the room untouched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.events.iter().all(|event| {
            matches!(
                event,
                Event::CommandIgnored { .. } | Event::MoveRejected { .. }
            )
        })
    }

    /// Whole seconds removed from the countdown by timer decay.
    #[must_use]
    pub fn decayed_secs(&self) -> u32 {
        self.events
            .iter()
            .map(|event| match event {
                Event::TimeDecayed { elapsed_secs, .. } => *elapsed_secs,
                _ => 0,
            })
            .sum()
    }

    /// Reports whether the operation moved the room into a terminal status.
    #[must_use]
    pub fn ended(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, Event::GameEnded { .. }))
    }
}

/// Authoritative state machine for a single room.
#[derive(Debug, Default)]
pub struct Session {
    generator: MazeGenerator,
    enemies: EnemyAi,
    validator: SabotageValidator,
}

impl Session {
    /// Creates a session from its constituent systems.
    #[must_use]
    pub fn new(generator: MazeGenerator, enemies: EnemyAi, validator: SabotageValidator) -> Self {
        Self {
            generator,
            enemies,
            validator,
        }
    }

    /// Starts a fresh game, keeping only the viewer count of `previous`.
    pub fn start<R: Rng + ?Sized>(
        &self,
        previous: RoomState,
        difficulty: Difficulty,
        wallet: Option<String>,
        now: Timestamp,
        rng: &mut R,
    ) -> Transition {
        let layout = self.generator.generate_layout(difficulty, rng);
        drive(
            previous,
            [Command::StartGame {
                difficulty,
                layout,
                wallet,
                now,
            }],
        )
    }

    /// Brings the countdown up to date with `now`.
    pub fn decay(&self, state: RoomState, now: Timestamp) -> Transition {
        drive(state, [Command::DecayTimer { now }])
    }

    /// Moves the runner one cell, then lets every enemy take one step.
    ///
    /// Rejected moves leave the room untouched. Enemies only act when the
    /// move was accepted and the game is still playing afterwards.
    pub fn move_player<R: Rng + ?Sized>(
        &self,
        state: RoomState,
        direction: Direction,
        now: Timestamp,
        rng: &mut R,
    ) -> Transition {
        let mut transition = drive(state, [Command::MovePlayer { direction, now }]);
        let moved = transition
            .events
            .iter()
            .any(|event| matches!(event, Event::PlayerMoved { .. }));
        if moved && transition.state.is_playing() {
            let mut world = World::from_state(transition.state);
            self.step_enemies(&mut world, rng, &mut transition.events);
            transition.state = world.into_state();
        }
        transition
    }

    /// Advances every enemy once, then resolves collisions.
    pub fn enemy_tick<R: Rng + ?Sized>(&self, state: RoomState, rng: &mut R) -> Transition {
        let mut world = World::from_state(state);
        let mut events = Vec::new();
        if world::query::room(&world).is_playing() {
            self.step_enemies(&mut world, rng, &mut events);
            world::apply(&mut world, Command::ResolveCollisions, &mut events);
        }
        Transition {
            state: world.into_state(),
            events,
        }
    }

    /// Applies collision damage if an enemy shares the runner's cell.
    pub fn check_collision(&self, state: RoomState) -> Transition {
        drive(state, [Command::ResolveCollisions])
    }

    /// Validates a sabotage without applying it.
    pub fn precheck(
        &self,
        state: &RoomState,
        kind: SabotageKind,
        cooldown_remaining: Duration,
    ) -> Result<SabotageEffect, SabotageRejection> {
        self.validator.precheck(state, kind, cooldown_remaining)
    }

    /// Validates and applies a sabotage.
    pub fn sabotage(
        &self,
        state: RoomState,
        kind: SabotageKind,
        cooldown_remaining: Duration,
    ) -> Result<Transition, SabotageRejection> {
        let effect = self.validator.precheck(&state, kind, cooldown_remaining)?;
        Ok(drive(state, [Command::ApplySabotage { effect }]))
    }

    /// Records a viewer joining.
    pub fn join_viewer(&self, state: RoomState) -> Transition {
        drive(state, [Command::JoinViewer])
    }

    /// Records a viewer leaving. The count never drops below zero.
    pub fn leave_viewer(&self, state: RoomState) -> Transition {
        drive(state, [Command::LeaveViewer])
    }

    fn step_enemies<R: Rng + ?Sized>(
        &self,
        world: &mut World,
        rng: &mut R,
        events: &mut Vec<Event>,
    ) {
        let mut commands = Vec::new();
        self.enemies
            .handle(world::query::room(world), rng, &mut commands);
        for command in commands {
            world::apply(world, command, events);
        }
    }
}

fn drive<I>(state: RoomState, commands: I) -> Transition
where
    I: IntoIterator<Item = Command>,
{
    let mut world = World::from_state(state);
    let mut events = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }
    Transition {
        state: world.into_state(),
        events,
    }
}
