use chain_counter::Line;
use embassy_rp::gpio::{Input, Pin, Pull};

use crate::{DownPin, GypsyPin, ResetPin, UpPin};

pub struct Switch<T: Pin> {
    pin: Input<'static, T>,
}

impl<T: Pin> Switch<T> {
    pub fn new(pin: T, pull: Pull) -> Self {
        Self {
            pin: Input::new(pin, pull),
        }
    }
}

impl<T: Pin> Line for Switch<T> {
    fn is_high(&mut self) -> bool {
        self.pin.is_high()
    }
}

/// The gypsy contact and the three operator buttons.
pub struct WindlassLines {
    pub gypsy: Switch<GypsyPin>,
    pub up: Switch<UpPin>,
    pub down: Switch<DownPin>,
    pub reset: Switch<ResetPin>,
}

impl WindlassLines {
    pub fn new(gypsy: GypsyPin, up: UpPin, down: DownPin, reset: ResetPin) -> Self {
        // the gypsy switch pulls the line low once per revolution, buttons drive it high
        Self {
            gypsy: Switch::new(gypsy, Pull::Up),
            up: Switch::new(up, Pull::Down),
            down: Switch::new(down, Pull::Down),
            reset: Switch::new(reset, Pull::Down),
        }
    }
}
