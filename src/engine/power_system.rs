use super::*;
use crate::constants::{
    power_duration_ms, release_delay_ms, CHASE_MS, EAT_FREEZE_MS, POWER_FLASH_INTERVAL_MS,
    POWER_FLASH_TOGGLES, PURSUER_BASE_POINTS, SCATTER_MS,
};

impl GameEngine {
    pub(super) fn start_mode_cycle(&mut self, mode: PursuerMode) {
        self.cycle_mode = mode;
        let (delay, next) = match mode {
            PursuerMode::Chase => (CHASE_MS, PursuerMode::Scatter),
            _ => (SCATTER_MS, PursuerMode::Chase),
        };
        self.cycle_timer = Some(self.schedule(delay, TimerAction::ModeCycle(next)));
    }

    pub(super) fn schedule_release(&mut self) {
        if self.idle_queue.is_empty() || self.release_timer.is_some() {
            return;
        }
        let delay = release_delay_ms(self.config.speed_level);
        self.release_timer = Some(self.schedule(delay, TimerAction::ReleasePursuer));
    }

    pub(super) fn power_up(&mut self) {
        let flash = self.flash_timer.take();
        self.cancel_timer(flash);
        self.combo = 0;
        self.scared.clear();
        for (idx, pursuer) in self.pursuers.iter_mut().enumerate() {
            if pursuer.become_scared() {
                self.scared.insert(idx);
            }
        }
        self.events.push(RuntimeEvent::PowerPelletConsumed);

        let duration = power_duration_ms(self.config.speed_level);
        self.flash_timer = Some(self.schedule(duration, TimerAction::PowerFlash(0)));
    }

    pub(super) fn power_flash(&mut self, toggles: u32) {
        if toggles >= POWER_FLASH_TOGGLES {
            for idx in std::mem::take(&mut self.scared) {
                self.pursuers[idx].end_scared();
            }
            return;
        }
        if self.scared.is_empty() {
            return;
        }
        for idx in &self.scared {
            let pursuer = &mut self.pursuers[*idx];
            if pursuer.mode == PursuerMode::Frightened {
                pursuer.toggle_palette();
            }
        }
        self.flash_timer = Some(self.schedule(
            POWER_FLASH_INTERVAL_MS,
            TimerAction::PowerFlash(toggles + 1),
        ));
    }

    pub(super) fn eat_pursuer(&mut self, player: usize, pursuer: usize) {
        for id in [self.flash_timer, self.cycle_timer, self.fruit_timer]
            .into_iter()
            .flatten()
        {
            self.timers.pause(id, self.elapsed_ms);
        }

        let points = PURSUER_BASE_POINTS.saturating_mul(2u32.saturating_pow(self.combo));
        self.combo += 1;
        self.intents.push_back(Intent::AwardPoints {
            points,
            kind: PointsKind::Pursuer,
        });

        let eaten = &mut self.pursuers[pursuer];
        let pixel = eaten.mover.pixel(&self.world);
        let kind = eaten.kind;
        eaten.become_eaten();
        self.scared.remove(&pursuer);
        self.eaten_count += 1;
        self.events.push(RuntimeEvent::PursuerEaten {
            pursuer: kind,
            x: pixel.x,
            y: pixel.y,
            size: self.world.tile_size,
            points,
        });
        self.push_timeline(format!("player {player} ate {kind:?} for {points}"));

        self.allow_player_movement = false;
        self.frozen_players = self
            .players
            .iter()
            .filter(|candidate| candidate.mover.moving)
            .map(|candidate| candidate.index)
            .collect();
        for candidate in &mut self.players {
            candidate.mover.moving = false;
        }
        if let Some(eater) = self.players.get_mut(player) {
            eater.mover.display = false;
        }
        let eaten = &mut self.pursuers[pursuer];
        eaten.mover.display = false;
        eaten.mover.moving = false;
        for other in &mut self.pursuers {
            other.paused = true;
            other.allow_collision = false;
        }

        self.start_sequence(vec![(
            EAT_FREEZE_MS,
            SequenceStep::EatFreezeEnd { player, pursuer },
        )]);
    }

    pub(super) fn end_eat_freeze(&mut self, player: usize, pursuer: usize) {
        if self.cutscene {
            if let Some(eater) = self.players.get_mut(player) {
                eater.mover.display = eater.enabled;
            }
            self.frozen_players.clear();
            return;
        }

        for id in [self.flash_timer, self.cycle_timer, self.fruit_timer]
            .into_iter()
            .flatten()
        {
            self.timers.resume(id, self.elapsed_ms);
        }
        self.allow_player_movement = true;
        if let Some(eater) = self.players.get_mut(player) {
            eater.mover.display = true;
        }
        for idx in std::mem::take(&mut self.frozen_players) {
            self.players[idx].mover.moving = true;
        }
        if let Some(eaten) = self.pursuers.get_mut(pursuer) {
            eaten.mover.display = true;
            eaten.mover.moving = true;
        }
        for other in &mut self.pursuers {
            other.paused = false;
            other.allow_collision = true;
        }
    }
}
