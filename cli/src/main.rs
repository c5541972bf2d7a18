/*
* Copyright 2019 Comcast Cable Communications Management, LLC
*
* Licensed under the Apache License, Version 2.0 (the "License");
* you may not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
* http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific language governing permissions and
* limitations under the License.
*
* SPDX-License-Identifier: Apache-2.0
*/

use anyhow::{anyhow, Context, Result};
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use colored::Colorize;
use pieng::ipam::{self, HostSlot};
use pieng::{load_config, Address, Block, IpamConfig, Probe};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::io::{self, ErrorKind, Write};
use std::iter;
use std::process;
use std::str::FromStr;
use tracing::{debug, Level};
use tracing_subscriber::fmt;

fn app() -> App<'static, 'static> {
    let parent = Arg::with_name("PARENT")
        .required(true)
        .help("block to search, e.g. 10.0.0.0/24");
    let mask = Arg::with_name("MASK")
        .required(true)
        .help("child prefix length");
    let siblings = Arg::with_name("SIBLINGS")
        .multiple(true)
        .help("blocks already allocated under the parent");
    let block = Arg::with_name("BLOCK")
        .required(true)
        .help("block holding the hosts");
    let taken = Arg::with_name("TAKEN")
        .multiple(true)
        .help("host addresses already allocated");

    App::new("pieng")
        .version(crate_version!())
        .about("IPv4 and IPv6 address-space allocation")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("file")
                .short("f")
                .long("file")
                .takes_value(true)
                .global(true)
                .help("configuration file"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .global(true)
                .help("more logging, repeat for more"),
        )
        .subcommand(
            SubCommand::with_name("split")
                .about("lists every child block of a mask")
                .arg(parent.clone())
                .arg(mask.clone()),
        )
        .subcommand(
            SubCommand::with_name("next-subnet")
                .about("prints the lowest free child block of a mask")
                .arg(parent.clone())
                .arg(mask.clone())
                .arg(siblings.clone()),
        )
        .subcommand(
            SubCommand::with_name("available")
                .about("lists every free child block of a mask")
                .arg(parent)
                .arg(mask)
                .arg(siblings),
        )
        .subcommand(
            SubCommand::with_name("next-host")
                .about("prints the lowest free host address")
                .arg(block.clone())
                .arg(taken.clone()),
        )
        .subcommand(
            SubCommand::with_name("slots")
                .about("lists every usable address of a small block")
                .arg(block)
                .arg(taken),
        )
        .subcommand(
            SubCommand::with_name("probe")
                .about("checks whether a host answers on TCP")
                .arg(
                    Arg::with_name("ADDRESS")
                        .required(true)
                        .help("address to probe"),
                ),
        )
}

fn parse<T>(matches: &ArgMatches<'_>, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = matches
        .value_of(name)
        .ok_or_else(|| anyhow!("missing {}", name))?;
    value
        .parse()
        .with_context(|| format!("bad {} '{}'", name, value))
}

fn parse_all<T, C>(matches: &ArgMatches<'_>, name: &str) -> Result<C>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    C: std::iter::FromIterator<T>,
{
    matches
        .values_of(name)
        .into_iter()
        .flatten()
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("bad {} '{}'", name, value))
        })
        .collect()
}

/// Writes one item per line. A closed pipe ends the listing quietly.
fn write_all<W: Write, T: Display>(out: &mut W, items: impl IntoIterator<Item = T>) -> Result<()> {
    for item in items {
        match writeln!(out, "{}", item) {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(()),
            written => written?,
        }
    }
    match out.flush() {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        flushed => Ok(flushed?),
    }
}

fn print_all<T: Display>(items: impl IntoIterator<Item = T>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_all(&mut out, items)
}

fn format_slot(slot: &HostSlot) -> String {
    match &slot.label {
        Some(label) => format!("{}\t{}", slot.address.to_string().yellow(), label),
        None => format!("{}\tfree", slot.address.to_string().green()),
    }
}

fn split(config: &IpamConfig, matches: &ArgMatches<'_>) -> Result<()> {
    let parent: Block = parse(matches, "PARENT")?;
    let mask: u8 = parse(matches, "MASK")?;

    ipam::check_split_depth(&parent, mask, config.max_split_depth)?;
    print_all(ipam::split(&parent, mask)?)
}

fn next_subnet(matches: &ArgMatches<'_>) -> Result<()> {
    let parent: Block = parse(matches, "PARENT")?;
    let mask: u8 = parse(matches, "MASK")?;
    let siblings: Vec<Block> = parse_all(matches, "SIBLINGS")?;

    print_all(iter::once(ipam::next_free_block(&parent, &siblings, mask)?))
}

fn available(config: &IpamConfig, matches: &ArgMatches<'_>) -> Result<()> {
    let parent: Block = parse(matches, "PARENT")?;
    let mask: u8 = parse(matches, "MASK")?;
    let siblings: Vec<Block> = parse_all(matches, "SIBLINGS")?;

    ipam::check_split_depth(&parent, mask, config.max_split_depth)?;
    print_all(ipam::free_blocks(&parent, &siblings, mask)?)
}

fn next_host(matches: &ArgMatches<'_>) -> Result<()> {
    let block: Block = parse(matches, "BLOCK")?;
    let taken: BTreeSet<Address> = parse_all(matches, "TAKEN")?;

    print_all(iter::once(ipam::next_free_host(&block, &taken)?))
}

fn slots(config: &IpamConfig, matches: &ArgMatches<'_>) -> Result<()> {
    let block: Block = parse(matches, "BLOCK")?;
    let taken: Vec<Address> = parse_all(matches, "TAKEN")?;
    let hosts = taken
        .into_iter()
        .map(|address| (address, "taken".to_owned()))
        .collect::<BTreeMap<_, _>>();

    let slots = ipam::host_slots(&block, &hosts, config.host_enumeration_cap)?;
    print_all(slots.iter().map(format_slot))
}

fn probe(config: &IpamConfig, matches: &ArgMatches<'_>) -> Result<()> {
    let address: Address = parse(matches, "ADDRESS")?;
    let probe = Probe::from(&config.probe);

    let verdict = if probe.responds(address) {
        "alive".green().bold()
    } else {
        "no response".red()
    };
    print_all(iter::once(format!("{} {}", address, verdict)))
}

fn run(matches: &ArgMatches<'_>) -> Result<()> {
    let config = load_config(matches.value_of("file"))?;
    debug!(?config);

    match matches.subcommand() {
        ("split", Some(sub)) => split(&config, sub),
        ("next-subnet", Some(sub)) => next_subnet(sub),
        ("available", Some(sub)) => available(&config, sub),
        ("next-host", Some(sub)) => next_host(sub),
        ("slots", Some(sub)) => slots(&config, sub),
        ("probe", Some(sub)) => probe(&config, sub),
        (other, _) => Err(anyhow!("unknown command '{}'", other)),
    }
}

fn main() -> Result<()> {
    let matches = app().get_matches();

    let level = match matches.occurrences_of("verbose") {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Err(e) = run(&matches) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts `room` lines, then fails every write with `kind`.
    struct Pipe {
        written: Vec<u8>,
        room: usize,
        kind: ErrorKind,
    }

    impl Pipe {
        fn new(room: usize, kind: ErrorKind) -> Self {
            Pipe {
                written: vec![],
                room,
                kind,
            }
        }

        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.written)
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    impl Write for Pipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written.iter().filter(|&&b| b == b'\n').count() >= self.room {
                return Err(io::Error::from(self.kind));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn blocks(parent: &str, mask: u8) -> ipam::Subnets {
        ipam::split(&parent.parse::<Block>().unwrap(), mask).unwrap()
    }

    #[test]
    fn closed_pipe_ends_listing() {
        let mut pipe = Pipe::new(2, ErrorKind::BrokenPipe);
        assert!(write_all(&mut pipe, blocks("10.0.0.0/8", 30)).is_ok());
        assert_eq!(vec!["10.0.0.0/30", "10.0.0.4/30"], pipe.lines());
    }

    #[test]
    fn other_write_failures_propagate() {
        let mut pipe = Pipe::new(1, ErrorKind::Other);
        assert!(write_all(&mut pipe, blocks("10.0.0.0/24", 26)).is_err());
        assert_eq!(1, pipe.lines().len());
    }

    #[test]
    fn listing_respects_split_depth() {
        let config = IpamConfig {
            max_split_depth: Some(8),
            ..Default::default()
        };
        let matches = app().get_matches_from(vec!["pieng", "available", "10.0.0.0/8", "30"]);
        let (_, sub) = matches.subcommand();
        assert!(available(&config, sub.unwrap()).is_err());
    }
}
