use super::*;
use crate::constants::{
    DEATH_ANIMATION_MS, DEATH_FREEZE_MS, GAME_OVER_END_MS, GAME_OVER_TEXT_MS,
    LEVEL_CLEAR_DELAY_MS, MAZE_FLASH_MS, MAZE_UNCOVER_MS, READY_INITIAL_MS, READY_MS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SequenceStep {
    ReadyElapsed,
    EatFreezeEnd { player: usize, pursuer: usize },
    DeathRevealed { player: usize },
    CoverMaze,
    RestartAfterDeath,
    ShowGameOver,
    EndRound(GameOverReason),
    LevelClearFlash,
    MazeFlash { white: bool },
    AdvanceLevel,
}

#[derive(Clone, Debug, Default)]
pub(super) struct Sequence {
    steps: VecDeque<(u64, SequenceStep)>,
}

impl GameEngine {
    pub(super) fn start_sequence(&mut self, steps: Vec<(u64, SequenceStep)>) -> u64 {
        let id = self.next_sequence_id;
        self.next_sequence_id += 1;
        self.sequences.insert(
            id,
            Sequence {
                steps: steps.into(),
            },
        );
        self.schedule_sequence_step(id);
        id
    }

    fn extend_sequence(&mut self, id: u64, steps: Vec<(u64, SequenceStep)>) {
        if let Some(sequence) = self.sequences.get_mut(&id) {
            sequence.steps.extend(steps);
        }
    }

    fn schedule_sequence_step(&mut self, id: u64) {
        let delay = self
            .sequences
            .get(&id)
            .and_then(|sequence| sequence.steps.front())
            .map(|(delay, _)| *delay);
        match delay {
            Some(delay) => {
                self.schedule(delay, TimerAction::Sequence(id));
            }
            None => {
                self.sequences.remove(&id);
            }
        }
    }

    pub(super) fn run_sequence_step(&mut self, id: u64) {
        let Some((_, step)) = self
            .sequences
            .get_mut(&id)
            .and_then(|sequence| sequence.steps.pop_front())
        else {
            return;
        };
        self.apply_sequence_step(id, step);
        if self.ended {
            self.sequences.clear();
            return;
        }
        self.schedule_sequence_step(id);
    }

    fn apply_sequence_step(&mut self, id: u64, step: SequenceStep) {
        match step {
            SequenceStep::ReadyElapsed => self.finish_ready(),
            SequenceStep::EatFreezeEnd { player, pursuer } => self.end_eat_freeze(player, pursuer),
            SequenceStep::DeathRevealed { player } => {
                for pursuer in &mut self.pursuers {
                    pursuer.mover.display = false;
                }
                if let Some(dying) = self.players.get_mut(player) {
                    dying.begin_death_animation();
                }
                let next = if self.lives > 0 {
                    self.lives -= 1;
                    vec![
                        (DEATH_ANIMATION_MS, SequenceStep::CoverMaze),
                        (MAZE_UNCOVER_MS, SequenceStep::RestartAfterDeath),
                    ]
                } else {
                    vec![
                        (GAME_OVER_TEXT_MS, SequenceStep::ShowGameOver),
                        (GAME_OVER_END_MS, SequenceStep::EndRound(GameOverReason::GameOver)),
                    ]
                };
                self.extend_sequence(id, next);
            }
            SequenceStep::CoverMaze => {
                self.maze_covered = true;
                self.events.push(RuntimeEvent::MazeCover { visible: true });
            }
            SequenceStep::RestartAfterDeath => {
                self.maze_covered = false;
                self.events.push(RuntimeEvent::MazeCover { visible: false });
                self.allow_key_presses = true;
                self.reset_entities();
                self.hide_fruit();
                self.start_gameplay(false);
            }
            SequenceStep::ShowGameOver => {
                self.hide_fruit();
                self.game_over_shown = true;
                self.events.push(RuntimeEvent::GameOver);
                self.push_timeline(format!("game over with {} points", self.score));
            }
            SequenceStep::EndRound(reason) => self.end_round(reason),
            SequenceStep::LevelClearFlash => {
                for pursuer in &mut self.pursuers {
                    pursuer.mover.display = false;
                }
                self.maze_white = true;
                self.events.push(RuntimeEvent::MazeFlash { white: true });
            }
            SequenceStep::MazeFlash { white } => {
                self.maze_white = white;
                self.events.push(RuntimeEvent::MazeFlash { white });
            }
            SequenceStep::AdvanceLevel => self.advance_level(),
        }
    }

    pub(super) fn start_gameplay(&mut self, initial: bool) {
        self.scared.clear();
        self.eaten_count = 0;
        self.allow_player_movement = false;
        self.cutscene = true;
        let duration_ms = if initial { READY_INITIAL_MS } else { READY_MS };
        self.events.push(RuntimeEvent::Ready { duration_ms });
        self.start_sequence(vec![(duration_ms, SequenceStep::ReadyElapsed)]);
    }

    fn finish_ready(&mut self) {
        self.allow_pause = true;
        self.cutscene = false;
        self.allow_player_movement = true;
        for pursuer in &mut self.pursuers {
            pursuer.mover.moving = true;
        }
        self.start_mode_cycle(PursuerMode::Scatter);
        self.idle_queue = self
            .pursuers
            .iter()
            .enumerate()
            .filter(|(_, pursuer)| pursuer.is_waiting())
            .map(|(idx, _)| idx)
            .collect();
        self.schedule_release();
    }

    pub(super) fn start_death_sequence(&mut self, player: usize) {
        self.allow_pause = false;
        self.cutscene = true;
        self.allow_key_presses = false;
        self.allow_player_movement = false;
        self.cancel_round_timers();
        for candidate in &mut self.players {
            candidate.mover.moving = false;
        }
        for pursuer in &mut self.pursuers {
            pursuer.mover.moving = false;
            pursuer.allow_collision = false;
        }
        self.events.push(RuntimeEvent::PlayerDied { player });
        self.push_timeline(format!("player {player} caught"));
        self.start_sequence(vec![(
            DEATH_FREEZE_MS,
            SequenceStep::DeathRevealed { player },
        )]);
    }

    pub(super) fn start_level_clear(&mut self) {
        self.level_clearing = true;
        self.allow_pause = false;
        self.cutscene = true;
        self.allow_key_presses = false;
        self.allow_player_movement = false;
        self.cancel_round_timers();
        for candidate in &mut self.players {
            candidate.mover.moving = false;
        }
        for pursuer in &mut self.pursuers {
            pursuer.mover.moving = false;
            pursuer.allow_collision = false;
        }
        self.push_timeline(format!("level {} cleared", self.level));

        let mut steps = vec![(LEVEL_CLEAR_DELAY_MS, SequenceStep::LevelClearFlash)];
        for white in [false, true, false, true, false] {
            steps.push((MAZE_FLASH_MS, SequenceStep::MazeFlash { white }));
        }
        steps.push((MAZE_FLASH_MS, SequenceStep::CoverMaze));
        steps.push((MAZE_UNCOVER_MS, SequenceStep::AdvanceLevel));
        self.start_sequence(steps);
    }

    fn advance_level(&mut self) {
        self.maze_covered = false;
        self.maze_white = false;
        self.events.push(RuntimeEvent::MazeCover { visible: false });
        if self.level >= self.options.level_table.last_level() {
            self.events.push(RuntimeEvent::Finale);
            self.end_round(GameOverReason::Finale);
            return;
        }

        self.level += 1;
        self.level_clearing = false;
        self.allow_key_presses = true;
        self.hide_fruit();
        self.setup_for_level();
        self.rebuild_pickups();
        self.start_gameplay(false);
    }

    fn end_round(&mut self, reason: GameOverReason) {
        self.ended = true;
        self.end_reason = Some(reason);
        self.push_timeline(match reason {
            GameOverReason::GameOver => "round ended".to_string(),
            GameOverReason::Finale => "finale reached".to_string(),
        });
    }

    fn cancel_round_timers(&mut self) {
        let timers = [
            self.fruit_timer.take(),
            self.cycle_timer.take(),
            self.release_timer.take(),
            self.flash_timer.take(),
        ];
        for id in timers {
            self.cancel_timer(id);
        }
    }
}
