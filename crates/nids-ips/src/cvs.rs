//! CVS Protocol Decoder
//!
//! Detects published CVS vulnerabilities:
//! Bugtraq-10384, CVE-2004-0396 "Malformed Entry Modified and Unchanged
//! flag insertion".
//!
//! Rule clause: `cvs: invalid-entry;`
//!
//! The client sends newline-delimited commands, `name[ argument]`. An
//! `Entry` argument must look like `/file/version///`, e.g.
//! `/cvs.c/1.5///`. A server that trusts the field between the third and
//! fourth slash can be driven into a heap overflow by a following
//! `Is-modified`/`Unchanged` command.

use crate::clause::split_args;
use crate::option::{DetectionOption, EvalStatus, IpsOption};
use crate::{IpsError, Result};
use memchr::memchr;
use nids_common::Packet;
use std::sync::Arc;

/// Rule keyword
pub const CVS_KEYWORD: &str = "cvs";

const INVALID_ENTRY_STR: &str = "invalid-entry";

const COMMAND_DELIMITER: u8 = b'\n';
const COMMAND_SEPARATOR: u8 = b' ';
const ENTRY_STR: &[u8] = b"Entry";
const ENTRY_SEPARATOR: u8 = b'/';

/// Slashes a well-formed entry carries
const ENTRY_SEPARATORS: usize = 5;

/// Vulnerability checks the decoder knows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CvsCheck {
    InvalidEntry,
}

/// `cvs` detection option
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CvsOption {
    check: CvsCheck,
}

/// A command line split into name and argument, borrowed from the payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CvsCommand<'a> {
    pub name: &'a [u8],
    pub arg: Option<&'a [u8]>,
}

impl CvsCommand<'_> {
    pub fn is_entry(&self) -> bool {
        self.name.eq_ignore_ascii_case(ENTRY_STR)
    }
}

/// Structural verdict on an `Entry` argument
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryStatus {
    Valid,
    Invalid,
}

impl CvsOption {
    pub fn new(check: CvsCheck) -> Self {
        Self { check }
    }

    /// Parse clause arguments: exactly one keyword
    pub fn parse(args: Option<&str>) -> Result<Self> {
        let args = args.unwrap_or("");
        let toks = split_args(args, 2);

        match toks.as_slice() {
            [tok] if tok.eq_ignore_ascii_case(INVALID_ENTRY_STR) => {
                Ok(Self::new(CvsCheck::InvalidEntry))
            }
            [tok] => Err(IpsError::InvalidArgument {
                option: CVS_KEYWORD,
                token: tok.to_string(),
            }),
            _ => Err(IpsError::ArgumentCount {
                option: CVS_KEYWORD,
                args: args.to_string(),
                found: toks.len(),
            }),
        }
    }

    pub fn check(&self) -> CvsCheck {
        self.check
    }

    /// Scan `data` line by line; `true` means alert
    pub fn decode(&self, data: &[u8]) -> bool {
        let mut rest = data;

        while !rest.is_empty() {
            let (line, next) = split_line(rest);
            let command = tokenize(line);

            tracing::trace!(
                command = %String::from_utf8_lossy(command.name),
                argument = %command.arg.map_or("none".into(), String::from_utf8_lossy),
                "CVS command"
            );

            match self.check {
                CvsCheck::InvalidEntry => {
                    // The overflow needs a command after the bad entry
                    if command.is_entry()
                        && validate_entry(command.arg) == EntryStatus::Invalid
                        && !next.is_empty()
                    {
                        tracing::debug!(
                            offset = data.len() - rest.len(),
                            "CVS invalid Entry followed by more commands"
                        );
                        return true;
                    }
                }
            }

            rest = next;
        }

        false
    }
}

impl IpsOption for CvsOption {
    fn name(&self) -> &'static str {
        CVS_KEYWORD
    }

    fn eval(&self, packet: &Packet<'_>) -> EvalStatus {
        if packet.tcp.is_none() {
            return EvalStatus::NoMatch;
        }
        match packet.data() {
            Some(data) => self.decode(data).into(),
            None => EvalStatus::NoMatch,
        }
    }
}

/// Registry constructor
pub fn ctor(args: Option<&str>) -> Result<Arc<dyn DetectionOption>> {
    Ok(Arc::new(CvsOption::parse(args)?))
}

/// Split off the next line.
///
/// Returns the line without its delimiter and the data after it. Without
/// a delimiter the whole buffer is the line and nothing follows.
pub fn split_line(buf: &[u8]) -> (&[u8], &[u8]) {
    match memchr(COMMAND_DELIMITER, buf) {
        Some(eol) => (&buf[..eol], &buf[eol + 1..]),
        None => (buf, &[]),
    }
}

/// Split a line at the first space into command name and argument
pub fn tokenize(line: &[u8]) -> CvsCommand<'_> {
    match memchr(COMMAND_SEPARATOR, line) {
        Some(sep) => CvsCommand {
            name: &line[..sep],
            arg: Some(&line[sep + 1..]),
        },
        None => CvsCommand {
            name: line,
            arg: None,
        },
    }
}

/// Check an `Entry` argument: exactly five slashes, and the byte right
/// after the third slash must be `/` or `+`.
///
/// An absent or empty argument has nothing to validate.
pub fn validate_entry(arg: Option<&[u8]>) -> EntryStatus {
    let mut rest = match arg {
        Some(arg) if !arg.is_empty() => arg,
        _ => return EntryStatus::Valid,
    };
    let mut slashes = 0;

    while let Some(pos) = memchr(ENTRY_SEPARATOR, rest) {
        slashes += 1;
        rest = &rest[pos + 1..];

        // Checked before skipping ahead to the next slash
        if slashes == 3 && !matches!(rest.first(), Some(b'/' | b'+')) {
            return EntryStatus::Invalid;
        }
        if slashes > ENTRY_SEPARATORS {
            return EntryStatus::Invalid;
        }
    }

    if slashes == ENTRY_SEPARATORS {
        EntryStatus::Valid
    } else {
        EntryStatus::Invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn option() -> CvsOption {
        CvsOption::new(CvsCheck::InvalidEntry)
    }

    fn entry(arg: &[u8]) -> EntryStatus {
        validate_entry(Some(arg))
    }

    #[test]
    fn test_split_line() {
        assert_eq!(split_line(b"Entry x\nrest"), (&b"Entry x"[..], &b"rest"[..]));
        assert_eq!(split_line(b"Entry x\n"), (&b"Entry x"[..], &b""[..]));
        assert_eq!(split_line(b"no newline"), (&b"no newline"[..], &b""[..]));
        assert_eq!(split_line(b"\n"), (&b""[..], &b""[..]));
    }

    #[test]
    fn test_tokenize() {
        let cmd = tokenize(b"Entry /cvs.c/1.5///");
        assert_eq!(cmd.name, b"Entry");
        assert_eq!(cmd.arg, Some(&b"/cvs.c/1.5///"[..]));
        assert!(cmd.is_entry());

        let cmd = tokenize(b"Unchanged");
        assert_eq!(cmd.name, b"Unchanged");
        assert_eq!(cmd.arg, None);

        let cmd = tokenize(b"Argument ");
        assert_eq!(cmd.arg, Some(&b""[..]));

        assert!(tokenize(b"ENTRY x").is_entry());
        assert!(!tokenize(b"Entries x").is_entry());
    }

    #[test]
    fn test_validate_entry_shapes() {
        assert_eq!(entry(b"/cvs.c/1.5///"), EntryStatus::Valid);
        assert_eq!(entry(b"/cvs.c/1.5/+/"), EntryStatus::Valid);
        assert_eq!(entry(b"/cvs.c/1.5/+date/Tfoo"), EntryStatus::Valid);

        // 4 separators
        assert_eq!(entry(b"/cvs.cXX1.5///"), EntryStatus::Invalid);
        // 6 separators
        assert_eq!(entry(b"/cvs.c/1.5////"), EntryStatus::Invalid);
        // junk after the third separator
        assert_eq!(entry(b"/cvs.c/1.5/x//"), EntryStatus::Invalid);
        // third separator is the last byte
        assert_eq!(entry(b"/cvs.c/1.5/"), EntryStatus::Invalid);
        assert_eq!(entry(b"no slashes"), EntryStatus::Invalid);
    }

    #[test]
    fn test_validate_entry_nothing_to_check() {
        assert_eq!(validate_entry(None), EntryStatus::Valid);
        assert_eq!(validate_entry(Some(b"")), EntryStatus::Valid);
    }

    #[test]
    fn test_decode_valid_entry() {
        assert!(!option().decode(b"Entry /cvs.c/1.5///\nUnchanged\n"));
    }

    #[test]
    fn test_decode_invalid_entry_followed_by_command() {
        assert!(option().decode(b"Entry /cvs.cXX1.5///\nModified\n"));
        assert!(option().decode(b"Root /cvsroot\nentry /a/b/c/d\nIs-modified cvs.c\n"));
    }

    #[test]
    fn test_decode_invalid_entry_at_end() {
        assert!(!option().decode(b"Entry /cvs.cXX1.5///\n"));
        assert!(!option().decode(b"Entry /cvs.cXX1.5///"));
    }

    #[test]
    fn test_eval_guards() {
        let opt = option();
        let bad: &[u8] = b"Entry /a/b/x//\nModified\n";

        assert_eq!(opt.eval(&Packet::tcp(1024, 2401, bad)), EvalStatus::Match);
        assert_eq!(opt.eval(&Packet::tcp(1024, 2401, b"")), EvalStatus::NoMatch);
        assert_eq!(
            opt.eval(&Packet { tcp: None, payload: Some(bad) }),
            EvalStatus::NoMatch
        );
        assert_eq!(
            opt.eval(&Packet { payload: None, ..Packet::tcp(1, 2, b"") }),
            EvalStatus::NoMatch
        );
    }

    #[test]
    fn test_parse_clause_args() {
        assert_eq!(CvsOption::parse(Some("invalid-entry")).unwrap(), option());
        assert_eq!(CvsOption::parse(Some(" INVALID-ENTRY\t")).unwrap(), option());

        match CvsOption::parse(Some("bogus")) {
            Err(IpsError::InvalidArgument { token, .. }) => assert_eq!(token, "bogus"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            CvsOption::parse(Some("invalid-entry extra")),
            Err(IpsError::ArgumentCount { found: 2, .. })
        ));
        assert!(matches!(
            CvsOption::parse(None),
            Err(IpsError::ArgumentCount { found: 0, .. })
        ));
    }

    #[test]
    fn test_equivalent_clauses_share_identity() {
        let a = CvsOption::parse(Some("invalid-entry")).unwrap();
        let b = CvsOption::parse(Some("\tInvalid-Entry\n")).unwrap();
        assert!(a.equals(&b));
        assert_eq!(a.identity_hash(), b.identity_hash());
    }

    /// Straightforward reference: collect every slash position first
    fn reference(arg: &[u8]) -> EntryStatus {
        let slashes: Vec<usize> = arg
            .iter()
            .enumerate()
            .filter(|(_, &b)| b == b'/')
            .map(|(i, _)| i)
            .collect();
        let ok = slashes.len() == 5 && matches!(arg.get(slashes[2] + 1), Some(b'/' | b'+'));
        if ok {
            EntryStatus::Valid
        } else {
            EntryStatus::Invalid
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn validate_entry_matches_reference(
            arg in proptest::collection::vec(
                prop_oneof![Just(b'/'), Just(b'+'), Just(b'a')],
                1..24,
            ),
        ) {
            prop_assert_eq!(validate_entry(Some(&arg)), reference(&arg));
        }

        #[test]
        fn decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = option().decode(&data);
        }
    }
}
