use crate::SystemControl;

use super::{envelope::Envelope, length_counter::LengthCounter, sweep::Sweep};

/// Output level per step of the 8-step sequence, one row per duty setting.
const PULSE_DUTY: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

pub struct Pulse {
    pub duty_cycle: usize,
    duty_step: usize,

    /// 11-bit timer period written through $4002/$4003 and retuned by the
    /// sweep unit.
    pub timer_period: u32,
    timer: u32,

    pub length_counter: LengthCounter,
    pub envelope: Envelope,
    pub sweep: Sweep,

    /// Pulse 1's sweep adder is one's complement: its negated target
    /// undershoots pulse 2's by one.
    ones_complement_sweep: bool,
}

impl SystemControl for Pulse {
    fn reset(&mut self) {
        self.duty_cycle = 0;
        self.duty_step = 0;
        self.timer_period = 0;
        self.timer = 0;
        self.length_counter.reset();
        self.envelope.reset();
        self.sweep.reset();
    }
}

impl Pulse {
    pub fn new(ones_complement_sweep: bool) -> Self {
        Self {
            duty_cycle: 0,
            duty_step: 0,

            timer_period: 0,
            timer: 0,

            length_counter: LengthCounter::new(),
            envelope: Envelope::new(),
            sweep: Sweep::new(),

            ones_complement_sweep,
        }
    }

    /// Timer clock (every second CPU cycle).
    pub fn clock(&mut self) -> u8 {
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.duty_step = (self.duty_step + 1) & 0x07;
        } else {
            self.timer -= 1;
        }

        if self.muted() {
            return 0;
        }

        PULSE_DUTY[self.duty_cycle][self.duty_step] * self.envelope.output_volume()
    }

    /// $4003 side effect: the waveform restarts from the top of the duty
    /// sequence.
    pub fn restart_sequence(&mut self) {
        self.timer = self.timer_period;
        self.duty_step = 0;
    }

    /// Half-frame clock: when the sweep divider fires, the timer period
    /// moves toward the target.
    pub fn clock_sweep(&mut self) {
        let target = self.sweep_target();
        let in_range = self.timer_period >= 8 && target <= 0x7FF;

        if self.sweep.divider_fires() && in_range {
            self.timer_period = target.max(0) as u32;
        }
    }

    /// Where the sweep is steering the period.
    fn sweep_target(&self) -> i32 {
        let change = (self.timer_period >> self.sweep.shift) as i32;

        if self.sweep.negate_flag {
            self.timer_period as i32 - change - self.ones_complement_sweep as i32
        } else {
            self.timer_period as i32 + change
        }
    }

    /// Ultrasonic periods, sweep targets past $7FF, and an expired length
    /// counter all silence the channel; the sequencer keeps running.
    fn muted(&self) -> bool {
        self.timer_period < 8
            || self.sweep_target() > 0x7FF
            || self.length_counter.silenced()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sounding_pulse(ones_complement: bool) -> Pulse {
        let mut pulse = Pulse::new(ones_complement);
        pulse.length_counter.set_enabled(true);
        pulse.length_counter.load(0x01); // longest note
        pulse.envelope.constant_flag = true;
        pulse.envelope.set_volume(15);
        pulse
    }

    #[test]
    fn ultrasonic_periods_mute_the_output() {
        let mut pulse = sounding_pulse(false);
        pulse.duty_cycle = 3;

        pulse.timer_period = 7;
        assert_eq!(pulse.clock(), 0);

        pulse.timer_period = 8;
        pulse.restart_sequence();
        assert_eq!(pulse.clock(), 15, "duty 3 starts on a high step");
    }

    #[test]
    fn overflowing_sweep_target_mutes_the_output() {
        let mut pulse = sounding_pulse(false);
        pulse.duty_cycle = 3;

        // shift 0, no negate: the target doubles the period past $7FF
        pulse.sweep.write_byte(0b10000000);
        pulse.timer_period = 0x700;
        pulse.restart_sequence();

        assert_eq!(pulse.clock(), 0);
    }

    #[test]
    fn pulse_1_negated_target_undershoots_by_one() {
        let mut pulse1 = sounding_pulse(true);
        let mut pulse2 = sounding_pulse(false);

        for pulse in [&mut pulse1, &mut pulse2] {
            pulse.sweep.write_byte(0b10001001); // enabled, negate, shift 1
            pulse.timer_period = 0x100;
        }

        assert_eq!(pulse1.sweep_target() + 1, pulse2.sweep_target());
    }

    #[test]
    fn sweep_retunes_the_timer_period_when_the_divider_fires() {
        let mut pulse = sounding_pulse(false);

        pulse.sweep.write_byte(0b10000001); // enabled, shift 1, divider 0
        pulse.timer_period = 0x100;

        pulse.clock_sweep();

        assert_eq!(pulse.timer_period, 0x180);
    }
}
