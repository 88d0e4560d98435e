//! SSD1306 OLED controller (128x64), as found on SBC-OLED01 boards.
//!
//! Every transaction starts with a control byte per item:
//! - 0x80: a single command byte (or command option) follows
//! - 0x40: everything that follows is display RAM data
//!
//! The memory addressing mode is set to vertical during `init`, so uploaded
//! bytes fill a column (8 pages of 8 pixels) before moving right.
//!
//! Each operation uses a fixed tracker start, so a failing status tells which
//! operation and which byte failed.

use crate::AResult;
use crate::twi::{
	Address,
	Direction,
	LineDriver,
	Master,
	Session,
	Status,
};

pub const DEFAULT_ADDRESS: u8 = 0x3c;

pub const WIDTH: u8 = 128;
pub const HEIGHT: u8 = 64;
pub const BYTES_PER_SEG: u8 = HEIGHT / 8;
pub const RAM_SIZE: usize = WIDTH as usize * BYTES_PER_SEG as usize;

pub const PAYLOAD_COMMAND: u8 = 0x80;
pub const PAYLOAD_DATA: u8 = 0x40;

const CMD_ADDRESSING_MODE: u8 = 0x20;
const ADDRESSING_VERTICAL: u8 = 0x01;
const CMD_CHARGE_PUMP: u8 = 0x8d;
const CHARGE_PUMP_ENABLE: u8 = 0x14;
const CMD_DISPLAY_OFF: u8 = 0xae;
const CMD_CONTRAST: u8 = 0x81;
const CMD_COLUMN_RANGE: u8 = 0x21;
const CMD_PAGE_RANGE: u8 = 0x22;

const TRACK_INIT: u32 = 0;
const TRACK_ENABLE: u32 = 10;
const TRACK_CONTRAST: u32 = 15;
const TRACK_CLEAR: u32 = 20;
const TRACK_WINDOW: u32 = 30;
const TRACK_UPLOAD: u32 = 40;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Ssd1306 {
	address: Address,
}

impl Default for Ssd1306 {
	fn default() -> Self {
		Ssd1306 {
			address: Address(DEFAULT_ADDRESS),
		}
	}
}

/// Column and page range for uploads; bounds are inclusive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Window {
	columns: (u8, u8),
	pages: (u8, u8),
}

impl Window {
	pub fn new(columns: (u8, u8), pages: (u8, u8)) -> AResult<Self> {
		ensure!(columns.0 <= columns.1 && columns.1 < WIDTH, "invalid column range {:?} (display has {} columns)", columns, WIDTH);
		ensure!(pages.0 <= pages.1 && pages.1 < BYTES_PER_SEG, "invalid page range {:?} (display has {} pages)", pages, BYTES_PER_SEG);
		Ok(Window { columns, pages })
	}

	pub fn full() -> Self {
		Window {
			columns: (0, WIDTH - 1),
			pages: (0, BYTES_PER_SEG - 1),
		}
	}

	pub fn columns(&self) -> (u8, u8) {
		self.columns
	}

	pub fn pages(&self) -> (u8, u8) {
		self.pages
	}
}

// sends PAYLOAD_COMMAND before each byte
fn commands<D: LineDriver>(session: &mut Session<'_, D>, bytes: &[u8]) {
	for &byte in bytes {
		session.transmit(&[PAYLOAD_COMMAND, byte]);
	}
}

impl Ssd1306 {
	pub fn new(address: Address) -> Self {
		Ssd1306 { address }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	fn command_chat<D: LineDriver>(&self, master: &mut Master<D>, tracker: u32, bytes: &[u8]) -> Status {
		let mut session = master.begin_transaction(self.address, Direction::Send, tracker);
		commands(&mut session, bytes);
		session.end()
	}

	/// Vertical addressing and charge pump on; the display stays off.
	pub fn init<D: LineDriver>(&self, master: &mut Master<D>) -> Status {
		self.command_chat(master, TRACK_INIT, &[
			CMD_ADDRESSING_MODE, ADDRESSING_VERTICAL,
			CMD_CHARGE_PUMP, CHARGE_PUMP_ENABLE,
		])
	}

	pub fn set_enabled<D: LineDriver>(&self, master: &mut Master<D>, enabled: bool) -> Status {
		self.command_chat(master, TRACK_ENABLE, &[CMD_DISPLAY_OFF | enabled as u8])
	}

	pub fn set_contrast<D: LineDriver>(&self, master: &mut Master<D>, contrast: u8) -> Status {
		self.command_chat(master, TRACK_CONTRAST, &[CMD_CONTRAST, contrast])
	}

	/// Zero the whole display RAM.
	pub fn clear<D: LineDriver>(&self, master: &mut Master<D>) -> Status {
		self.upload_with(master, TRACK_CLEAR, &[0u8; RAM_SIZE])
	}

	/// Restrict following uploads to a window.
	pub fn set_window<D: LineDriver>(&self, master: &mut Master<D>, window: Window) -> Status {
		let (columns, pages) = (window.columns(), window.pages());
		self.command_chat(master, TRACK_WINDOW, &[
			CMD_COLUMN_RANGE, columns.0, columns.1,
			CMD_PAGE_RANGE, pages.0, pages.1,
		])
	}

	/// Send bitmap bytes into display RAM at the current position.
	pub fn upload<D: LineDriver>(&self, master: &mut Master<D>, bitmap: &[u8]) -> Status {
		self.upload_with(master, TRACK_UPLOAD, bitmap)
	}

	fn upload_with<D: LineDriver>(&self, master: &mut Master<D>, tracker: u32, bitmap: &[u8]) -> Status {
		let mut session = master.begin_transaction(self.address, Direction::Send, tracker);
		session.transmit(&[PAYLOAD_DATA]).transmit(bitmap);
		session.end()
	}
}
