#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate twi_bitbang;
use twi_bitbang::*;

use std::process::exit;
use std::time::Duration;

use twi_bitbang::sim::{
	Fault,
	SimBus,
	SimDevice,
};
use twi_bitbang::ssd1306::{
	self,
	Ssd1306,
};
use twi_bitbang::twi::{
	Address,
	Config,
	Master,
	Paced,
	Status,
	Timeout,
};

type DebugMaster = Master<Paced<SimBus>>;

fn parse_param<T>(name: &str, param: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	parse_param(name, param)
}

fn get_optional_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<Option<T>>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	if matches.is_present(name) {
		get_param(matches, name).map(Some)
	} else {
		Ok(None)
	}
}

// comma separated list, e.g. "0x3c,0x50"
fn get_list_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<Vec<T>>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(Vec::new()),
	};
	param.split(',')
		.filter(|item| !item.is_empty())
		.map(|item| parse_param(name, item))
		.collect()
}

fn get_bytes(values: Option<clap::Values>) -> AResult<Vec<u8>> {
	values.into_iter().flatten().map(parse_byte).collect()
}

struct BusSetup {
	devices: Vec<Address>,
	stretch: u32,
	faults: Vec<Fault>,
	config: Config,
	edge: Duration,
}

impl BusSetup {
	fn from_matches(matches: &clap::ArgMatches) -> AResult<Self> {
		let mut devices: Vec<Address> = get_list_param(matches, "devices")?;
		if devices.is_empty() {
			devices.push(Ssd1306::default().address());
		}
		let mut config = Config::default();
		if let Some(timeout) = get_optional_param::<Timeout>(matches, "timeout")? {
			config = config.with_timeout(timeout);
		}
		let edge_nanos: u64 = get_optional_param(matches, "delay")?.unwrap_or(0);

		Ok(BusSetup {
			devices,
			stretch: get_optional_param(matches, "stretch")?.unwrap_or(0),
			faults: get_list_param(matches, "faults")?,
			config,
			edge: Duration::from_nanos(edge_nanos),
		})
	}

	// `data` is served by the device with address `reader`
	fn build(&self, reader: Option<(Address, &[u8])>) -> DebugMaster {
		let mut bus = SimBus::new().with_clock_stretch(self.stretch);
		for &address in &self.devices {
			let mut device = SimDevice::new(address);
			if let Some((target, data)) = reader {
				if target == address {
					device = device.with_data(data);
				}
			}
			bus = bus.with_device(device);
		}
		for &fault in &self.faults {
			bus.inject(fault);
		}
		debug!("simulated bus: devices {:?}, stretch {}, faults {:?}, {:?}", self.devices, self.stretch, self.faults, self.config);
		Master::new(Paced::new(bus, self.edge), self.config)
	}
}

fn report(master: &DebugMaster, status: Status) -> AResult<()> {
	println!("{}", master.driver().get_ref().trace());
	println!("{}", status);
	status.into_result()?;
	Ok(())
}

fn send(setup: &BusSetup, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address: Address = get_param(sub_m, "ADDRESS")?;
	let bytes = get_bytes(sub_m.values_of("BYTES"))?;

	let mut master = setup.build(None);
	let status = master.write(address, &bytes, 0);
	report(&master, status)
}

fn read(setup: &BusSetup, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address: Address = get_param(sub_m, "ADDRESS")?;
	let count: usize = get_param(sub_m, "COUNT")?;
	ensure!(count > 0, "need to read at least one byte");
	let data = get_bytes(sub_m.values_of("data"))?;

	let mut master = setup.build(Some((address, &data[..])));
	let mut buffer = vec![0u8; count];
	let status = master.read(address, &mut buffer, 0);
	if status.is_ok() {
		let hex: Vec<String> = buffer.iter().map(|b| format!("{:02x}", b)).collect();
		info!("read from {}: {}", address, hex.join(" "));
	}
	report(&master, status)
}

fn scan(setup: &BusSetup) -> AResult<()> {
	let mut master = setup.build(None);
	let found = master.scan();
	if found.is_empty() {
		println!("no devices found");
	}
	for address in found {
		println!("{}", address);
	}
	Ok(())
}

fn oled_init(setup: &BusSetup, sub_m: &clap::ArgMatches) -> AResult<()> {
	// first simulated device unless given
	let address = match get_optional_param::<Address>(sub_m, "ADDRESS")? {
		Some(address) => address,
		None => setup.devices.first().cloned().unwrap_or_else(|| Ssd1306::default().address()),
	};
	let mut master = setup.build(None);
	let oled = Ssd1306::new(address);

	let status = oled.init(&mut master);
	if !status.is_ok() {
		return report(&master, status);
	}
	let status = oled.set_enabled(&mut master, true);
	report(&master, status)?;
	info!("{}x{} display at {} initialized", ssd1306::WIDTH, ssd1306::HEIGHT, address);
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg devices: -d --devices +takes_value "comma separated addresses of simulated devices (default: 0x3c)")
		(@arg stretch: -s --stretch +takes_value "devices stretch the clock for this many line polls")
		(@arg timeout: -t --timeout +takes_value "bound for waiting on the bus: number of polls, or \"unbounded\"")
		(@arg delay: -e --delay +takes_value "delay after each clock edge in nanoseconds")
		(@arg faults: -f --faults +takes_value "comma separated faults to inject: miss-start, miss-stop, hold-clock, stall-transfer, spurious-start, spurious-stop, collision")
		(@subcommand send =>
			(about: "send bytes to a device")
			(@arg ADDRESS: +required "device address")
			(@arg BYTES: +required +multiple "bytes to send (decimal or 0x-prefixed hex)")
		)
		(@subcommand read =>
			(about: "read bytes from a device")
			(@arg ADDRESS: +required "device address")
			(@arg COUNT: +required "number of bytes to read")
			(@arg data: --data +takes_value +multiple "bytes the simulated device returns")
		)
		(@subcommand scan =>
			(about: "probe all regular addresses")
		)
		(@subcommand oled_init =>
			(about: "initialize and enable an SSD1306 display")
			(@arg ADDRESS: "display address (default: first simulated device)")
		)
	).get_matches();

	let setup = BusSetup::from_matches(&matches)?;

	match matches.subcommand() {
		("send", Some(sub_m)) => {
			send(&setup, sub_m)
		},
		("read", Some(sub_m)) => {
			read(&setup, sub_m)
		},
		("scan", _) => {
			scan(&setup)
		},
		("oled_init", Some(sub_m)) => {
			oled_init(&setup, sub_m)
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
