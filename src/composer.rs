//! Gamepad state and report dispatch
use core::fmt::Debug;
use log::{debug, error, info, trace};
use packed_struct::prelude::*;

use crate::gamepad::{GamepadReport, HatPosition};

/// Destination for packed gamepad reports
pub trait ReportSink {
    type Error: Debug;

    /// Called once by [`ReportComposer::begin`]
    fn register(&mut self) {}

    /// Called once by [`ReportComposer::end`]
    fn unregister(&mut self) {}

    fn send(&mut self, report: &[u8]) -> Result<(), Self::Error>;
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    type Error = S::Error;

    fn register(&mut self) {
        (**self).register();
    }

    fn unregister(&mut self) {
        (**self).unregister();
    }

    fn send(&mut self, report: &[u8]) -> Result<(), Self::Error> {
        (**self).send(report)
    }
}

/// Range of the raw values passed to the axis setters
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum ScalingMode {
    /// -127..=127
    EightBit,
    /// 0..=1023
    #[default]
    TenBit,
    /// -32767..=32767, passed through unchanged
    SixteenBit,
}

impl ScalingMode {
    /// Clamp `value` to the mode's input range and rescale it to -32767..=32767
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn map(self, value: i32) -> i16 {
        let mapped = match self {
            ScalingMode::EightBit => value.clamp(-127, 127) * AXIS_MAX / 127,
            ScalingMode::TenBit => value.clamp(0, 1023) * (2 * AXIS_MAX) / 1023 - AXIS_MAX,
            ScalingMode::SixteenBit => value.clamp(-AXIS_MAX, AXIS_MAX),
        };
        mapped as i16
    }
}

const AXIS_MAX: i32 = i16::MAX as i32;

/// Builds gamepad reports from individual control updates and hands them to a [`ReportSink`].
///
/// Every setter sends the whole report immediately unless manual send is enabled, in which
/// case nothing goes out until [`ReportComposer::send_now`]. Setters still update the report
/// before [`ReportComposer::begin`] but do not send it. Sink errors are logged and dropped.
pub struct ReportComposer<S: ReportSink> {
    sink: S,
    report: GamepadReport,
    scaling_mode: ScalingMode,
    manual_send: bool,
    registered: bool,
}

impl<S: ReportSink> ReportComposer<S> {
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            report: GamepadReport::default(),
            scaling_mode: ScalingMode::default(),
            manual_send: false,
            registered: false,
        }
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Reset to the idle report and register with the sink. Does nothing if already begun.
    pub fn begin(&mut self) {
        if self.registered {
            return;
        }
        self.report = GamepadReport::default();
        self.registered = true;
        self.sink.register();
        info!("Gamepad composer started");
    }

    /// Unregister from the sink. The current report is kept.
    pub fn end(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        self.sink.unregister();
        info!("Gamepad composer stopped");
    }

    /// End and hand back the sink
    #[must_use]
    pub fn release(mut self) -> S {
        self.end();
        self.sink
    }

    #[must_use]
    pub fn report(&self) -> GamepadReport {
        self.report
    }

    #[must_use]
    pub fn map_bits(&self, value: i32) -> i16 {
        self.scaling_mode.map(value)
    }

    pub fn set_x(&mut self, value: i32) {
        self.report.x = self.map_bits(value);
        self.changed();
    }

    pub fn set_y(&mut self, value: i32) {
        self.report.y = self.map_bits(value);
        self.changed();
    }

    pub fn set_z(&mut self, value: i32) {
        self.report.z = self.map_bits(value);
        self.changed();
    }

    pub fn set_z_rotate(&mut self, value: i32) {
        self.report.rz = self.map_bits(value);
        self.changed();
    }

    pub fn set_slider_left(&mut self, value: i32) {
        self.report.rx = self.map_bits(value);
        self.changed();
    }

    pub fn set_slider_right(&mut self, value: i32) {
        self.report.ry = self.map_bits(value);
        self.changed();
    }

    /// Same as [`ReportComposer::set_slider_left`]
    pub fn set_slider(&mut self, value: i32) {
        self.set_slider_left(value);
    }

    /// Update both stick axes with a single report
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.report.x = self.map_bits(x);
        self.report.y = self.map_bits(y);
        self.changed();
    }

    /// `number` counts from 1, zero and anything above 32 is ignored
    pub fn button(&mut self, number: u8, pressed: bool) {
        match number {
            1..=32 => self.set_button(number - 1, pressed),
            _ => trace!("Ignoring button {}", number),
        }
    }

    /// `index` counts from 0, anything above 31 is ignored
    pub fn set_button(&mut self, index: u8, pressed: bool) {
        if index >= 32 {
            trace!("Ignoring button index {}", index);
            return;
        }
        self.report.set_button(index, pressed);
        self.changed();
    }

    pub fn set_hat(&mut self, hat: HatPosition) {
        self.report.set_hat_position(hat);
        self.changed();
    }

    /// Degrees clockwise from up, `-1` releases the hat. See [`HatPosition::from_angle`].
    pub fn set_hat_angle(&mut self, angle: i32) {
        self.set_hat(HatPosition::from_angle(angle));
    }

    /// There is a single hat, `_number` is ignored
    pub fn set_hat_for(&mut self, _number: u8, angle: i32) {
        self.set_hat_angle(angle);
    }

    /// `false` only has an effect while eight bit scaling is active, it returns to ten bit
    pub fn use_8bit(&mut self, enable: bool) {
        if enable {
            self.set_scaling_mode(ScalingMode::EightBit);
        } else if self.scaling_mode == ScalingMode::EightBit {
            self.set_scaling_mode(ScalingMode::TenBit);
        }
    }

    pub fn use_10bit(&mut self) {
        self.set_scaling_mode(ScalingMode::TenBit);
    }

    pub fn use_16bit(&mut self) {
        self.set_scaling_mode(ScalingMode::SixteenBit);
    }

    /// Applies to subsequent axis updates only
    pub fn set_scaling_mode(&mut self, mode: ScalingMode) {
        self.scaling_mode = mode;
    }

    #[must_use]
    pub fn scaling_mode(&self) -> ScalingMode {
        self.scaling_mode
    }

    pub fn use_manual_send(&mut self, manual: bool) {
        self.manual_send = manual;
    }

    /// Send the current report once, whatever the send mode
    pub fn send_now(&mut self) {
        let data = match self.report.pack() {
            Ok(data) => data,
            Err(_) => {
                error!("Error packing GamepadReport");
                return;
            }
        };

        if let Err(e) = self.sink.send(&data) {
            debug!("Gamepad report dropped: {:?}", e);
        }
    }

    fn changed(&mut self) {
        if self.registered && !self.manual_send {
            self.send_now();
        }
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]

    use std::vec::Vec;

    use super::*;
    use crate::gamepad::GAMEPAD_REPORT_SIZE;

    #[derive(Debug)]
    struct Rejected;

    #[derive(Default)]
    struct MockSink {
        sent: Vec<Vec<u8>>,
        registered: usize,
        unregistered: usize,
        reject: bool,
    }

    impl MockSink {
        fn last(&self) -> GamepadReport {
            GamepadReport::unpack_from_slice(self.sent.last().unwrap()).unwrap()
        }
    }

    impl ReportSink for MockSink {
        type Error = Rejected;

        fn register(&mut self) {
            self.registered += 1;
        }

        fn unregister(&mut self) {
            self.unregistered += 1;
        }

        fn send(&mut self, report: &[u8]) -> Result<(), Self::Error> {
            if self.reject {
                return Err(Rejected);
            }
            self.sent.push(report.to_vec());
            Ok(())
        }
    }

    fn started() -> ReportComposer<MockSink> {
        let mut pad = ReportComposer::new(MockSink::default());
        pad.begin();
        pad
    }

    #[test]
    fn ten_bit_scaling() {
        let mode = ScalingMode::TenBit;
        assert_eq!(mode.map(0), -32767);
        assert_eq!(mode.map(1023), 32767);
        assert!(mode.map(512).abs() <= 64);
        assert!(mode.map(511).abs() <= 64);
        assert_eq!(mode.map(-100), -32767);
        assert_eq!(mode.map(5000), 32767);

        let mut previous = mode.map(0);
        for value in 1..=1023 {
            let mapped = mode.map(value);
            assert!(mapped >= previous, "not monotonic at {}", value);
            previous = mapped;
        }
    }

    #[test]
    fn eight_bit_scaling() {
        let mode = ScalingMode::EightBit;
        assert_eq!(mode.map(-127), -32767);
        assert_eq!(mode.map(0), 0);
        assert_eq!(mode.map(127), 32767);
        assert_eq!(mode.map(-128), -32767);
        assert_eq!(mode.map(200), 32767);

        let mut previous = mode.map(-127);
        for value in -126..=127 {
            let mapped = mode.map(value);
            assert!(mapped >= previous, "not monotonic at {}", value);
            previous = mapped;
        }
    }

    #[test]
    fn eight_bit_is_symmetric() {
        let mode = ScalingMode::EightBit;
        assert_eq!(mode.map(1), 258);
        assert_eq!(mode.map(-1), -258);
        for value in -127..=127 {
            assert_eq!(mode.map(-value), -mode.map(value), "asymmetric at {}", value);
        }
    }

    #[test]
    fn sixteen_bit_scaling() {
        let mode = ScalingMode::SixteenBit;
        for value in [-32767, -1, 0, 1, 12345, 32767] {
            assert_eq!(i32::from(mode.map(value)), value);
        }
        assert_eq!(mode.map(-40000), -32767);
        assert_eq!(mode.map(40000), 32767);
    }

    #[test]
    fn axis_setters_store_mapped_values() {
        let mut pad = started();
        pad.use_16bit();

        pad.set_x(1);
        pad.set_y(2);
        pad.set_z(3);
        pad.set_z_rotate(4);
        pad.set_slider_left(5);
        pad.set_slider_right(6);

        let report = pad.report();
        assert_eq!(
            (report.x, report.y, report.z, report.rz, report.rx, report.ry),
            (1, 2, 3, 4, 5, 6)
        );

        pad.set_slider(-7);
        assert_eq!(pad.report().rx, -7);
        assert_eq!(pad.sink().sent.len(), 7);
        assert_eq!(pad.sink().last(), pad.report());
    }

    #[test]
    fn scaling_change_affects_later_writes_only() {
        let mut pad = started();
        pad.set_x(1023);
        pad.use_8bit(true);
        assert_eq!(pad.scaling_mode(), ScalingMode::EightBit);
        pad.set_y(-127);

        let report = pad.report();
        assert_eq!(report.x, 32767);
        assert_eq!(report.y, -32767);
        assert_eq!(pad.map_bits(0), 0);
    }

    #[test]
    fn disabling_eight_bit() {
        let mut pad = started();
        pad.use_16bit();
        pad.use_8bit(false);
        assert_eq!(pad.scaling_mode(), ScalingMode::SixteenBit);

        pad.use_8bit(true);
        pad.use_8bit(false);
        assert_eq!(pad.scaling_mode(), ScalingMode::TenBit);

        pad.set_scaling_mode(ScalingMode::SixteenBit);
        pad.use_10bit();
        assert_eq!(pad.scaling_mode(), ScalingMode::TenBit);
    }

    #[test]
    fn set_position_sends_once() {
        let mut pad = started();
        pad.set_position(100, 200);

        assert_eq!(pad.sink().sent.len(), 1);
        let sent = pad.sink().last();
        assert_eq!(sent.x, pad.map_bits(100));
        assert_eq!(sent.y, pad.map_bits(200));
    }

    #[test]
    fn buttons() {
        let mut pad = started();
        pad.button(1, true);
        assert_eq!(pad.report().buttons, 0b1);
        pad.button(32, true);
        assert_eq!(pad.report().buttons, 0x8000_0001);
        assert_eq!(pad.sink().sent.len(), 2);

        pad.button(33, true);
        pad.button(0, true);
        pad.set_button(32, true);
        assert_eq!(pad.report().buttons, 0x8000_0001);
        assert_eq!(pad.sink().sent.len(), 2);

        pad.set_button(0, false);
        pad.button(32, false);
        assert_eq!(pad.report().buttons, 0);
        assert_eq!(pad.sink().last().buttons, 0);
    }

    #[test]
    fn hat() {
        let mut pad = started();
        pad.set_hat(HatPosition::Left);
        assert_eq!(pad.report().hat_position(), HatPosition::Left);

        for (angle, expected) in [
            (0, HatPosition::Up),
            (45, HatPosition::UpRight),
            (359, HatPosition::Up),
            (400, HatPosition::UpRight),
            (-1, HatPosition::Idle),
        ] {
            pad.set_hat_angle(angle);
            assert_eq!(pad.report().hat_position(), expected, "angle {}", angle);
        }

        pad.set_hat_for(3, 270);
        assert_eq!(pad.sink().last().hat_position(), HatPosition::Left);
    }

    #[test]
    fn manual_send() {
        let mut pad = started();
        pad.use_manual_send(true);

        pad.set_x(0);
        pad.button(5, true);
        pad.set_hat(HatPosition::Down);
        assert!(pad.sink().sent.is_empty());

        pad.send_now();
        assert_eq!(pad.sink().sent.len(), 1);
        let sent = pad.sink().last();
        assert_eq!(sent, pad.report());
        assert_eq!(sent.x, -32767);
        assert!(sent.button(4));
        assert_eq!(sent.hat_position(), HatPosition::Down);

        pad.use_manual_send(false);
        pad.set_y(1023);
        assert_eq!(pad.sink().sent.len(), 2);
    }

    #[test]
    fn sent_report_is_packed() {
        let mut pad = started();
        pad.button(2, true);

        let sent = &pad.sink().sent[0];
        assert_eq!(sent.len(), GAMEPAD_REPORT_SIZE);
        assert_eq!(sent.as_slice(), &pad.report().pack().unwrap()[..]);
    }

    #[test]
    fn setters_before_begin_do_not_send() {
        let mut pad = ReportComposer::new(MockSink::default());
        pad.use_16bit();
        pad.set_x(10);
        assert_eq!(pad.report().x, 10);
        assert!(pad.sink().sent.is_empty());

        pad.begin();
        assert_eq!(pad.report(), GamepadReport::default());
        assert_eq!(pad.sink().registered, 1);
    }

    #[test]
    fn lifecycle() {
        let mut pad = started();
        pad.use_16bit();
        pad.set_x(10);

        pad.begin();
        assert_eq!(pad.sink().registered, 1);
        assert_eq!(pad.report().x, 10);

        pad.end();
        pad.end();
        assert_eq!(pad.sink().unregistered, 1);
        assert_eq!(pad.report().x, 10);

        pad.set_y(20);
        assert_eq!(pad.sink().sent.len(), 1);

        pad.begin();
        let sink = pad.release();
        assert_eq!(sink.registered, 2);
        assert_eq!(sink.unregistered, 2);
    }

    #[test]
    fn sink_errors_are_dropped() {
        let mut pad = ReportComposer::new(MockSink {
            reject: true,
            ..Default::default()
        });
        pad.begin();
        pad.button(1, true);
        pad.send_now();

        assert!(pad.sink().sent.is_empty());
        assert!(pad.report().button(0));
    }

    #[test]
    fn borrowed_sink() {
        let mut sink = MockSink::default();
        {
            let mut pad = ReportComposer::new(&mut sink);
            pad.begin();
            pad.set_hat(HatPosition::Up);
            pad.end();
        }
        assert_eq!(sink.sent.len(), 1);
        assert_eq!(sink.registered, 1);
        assert_eq!(sink.unregistered, 1);
    }
}
