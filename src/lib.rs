#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod sim;
pub mod ssd1306;
pub mod twi;

/// parse a byte given either as decimal or as `0x`-prefixed hex
pub fn parse_byte(s: &str) -> AResult<u8> {
	with_context!(("invalid byte {:?}", s), {
		if s.starts_with("0x") || s.starts_with("0X") {
			Ok(u8::from_str_radix(&s[2..], 16)?)
		} else {
			Ok(s.parse::<u8>()?)
		}
	})
}
