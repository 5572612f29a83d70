// Native binary format: versioned header, symbol tables, Pod state and arc tables.

use crate::WfstError;
use crate::arc::{NO_STATE, StateId};
use crate::fst::{AnyFst, Fst, mismatch};
use crate::io::bytes::{ByteReader, pad_to, put_i64, put_string_u32, put_u32};
use crate::io::records::{NativeArc, NativeState};
use crate::semiring::{
    LogSemiring, ProbabilitySemiring, Semiring, SemiringKind, TropicalSemiring, Weight,
};
use crate::state::State;
use crate::symbols::{SymbolTable, SymbolTableRef};

/// Header magic constants (little-endian).
const COOKIE1: u32 = 0x5453_4657;
const COOKIE2: u32 = 0x0001_F57A;

/// Format version written by this crate.
pub const VERSION: u32 = 1;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Alignment of the state and arc tables.
const TABLE_ALIGN: usize = 16;

const HAS_ISYMBOLS: u32 = 0x1;
const HAS_OSYMBOLS: u32 = 0x2;

/// Parsed native header.
///
/// - bytes 0..4: cookie1
/// - bytes 4..8: cookie2
/// - bytes 8..12: format version
/// - bytes 12..16: semiring tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeHeader {
    pub version: u32,
    pub kind: SemiringKind,
}

/// True when `data` starts with the native cookies.
pub fn is_native(data: &[u8]) -> bool {
    let mut r = ByteReader::new(data);
    matches!((r.u32(), r.u32()), (Ok(COOKIE1), Ok(COOKIE2)))
}

/// Parses and validates the 16-byte header.
pub fn parse_header(data: &[u8]) -> Result<NativeHeader, WfstError> {
    read_header(&mut ByteReader::new(data))
}

fn read_header(r: &mut ByteReader<'_>) -> Result<NativeHeader, WfstError> {
    if r.remaining() < HEADER_SIZE {
        return Err(WfstError::Truncated {
            expected: HEADER_SIZE,
            actual: r.remaining(),
        });
    }
    let cookie1 = r.u32()?;
    let cookie2 = r.u32()?;
    if cookie1 != COOKIE1 || cookie2 != COOKIE2 {
        return Err(WfstError::Format("not a native fst file".into()));
    }
    let version = r.u32()?;
    if version != VERSION {
        return Err(WfstError::UnsupportedVersion {
            found: version.into(),
            supported: VERSION.into(),
        });
    }
    let tag = r.u32()?;
    let kind = SemiringKind::from_tag(tag)
        .ok_or_else(|| WfstError::Format(format!("unknown semiring tag {tag}")))?;
    Ok(NativeHeader { version, kind })
}

/// Deserialize an automaton over `S`.
pub fn read<S: Semiring>(data: &[u8]) -> Result<Fst<S>, WfstError> {
    let mut r = ByteReader::new(data);
    let header = read_header(&mut r)?;
    if header.kind != S::KIND {
        return Err(mismatch(S::KIND, header.kind));
    }
    read_body(&mut r)
}

/// Deserialize an automaton over the semiring named in the header.
pub fn read_any(data: &[u8]) -> Result<AnyFst, WfstError> {
    let mut r = ByteReader::new(data);
    match read_header(&mut r)?.kind {
        SemiringKind::Tropical => read_body::<TropicalSemiring>(&mut r).map(AnyFst::from),
        SemiringKind::Log => read_body::<LogSemiring>(&mut r).map(AnyFst::from),
        SemiringKind::Probability => read_body::<ProbabilitySemiring>(&mut r).map(AnyFst::from),
    }
}

fn read_symbols(r: &mut ByteReader<'_>) -> Result<SymbolTableRef, WfstError> {
    let name = r.string_u32()?;
    let available_key = r.i64()?;
    let count = r.u32()?;
    let mut table = SymbolTable::new(name);
    for _ in 0..count {
        let symbol = r.string_u32()?;
        let key = r.i64()?;
        if table.add_symbol_with_key(&symbol, key) != Some(key) {
            return Err(WfstError::Format(format!(
                "duplicate symbol table entry {symbol:?} = {key}"
            )));
        }
    }
    table.set_available_key(available_key);
    Ok(std::sync::Arc::new(table))
}

/// Copy `count` Pod records out of the stream into an aligned Vec.
fn read_table<T: bytemuck::Pod>(r: &mut ByteReader<'_>, count: usize) -> Result<Vec<T>, WfstError> {
    let len = count
        .checked_mul(size_of::<T>())
        .ok_or_else(|| WfstError::Format(format!("record count {count} overflows")))?;
    let bytes = r.take(len)?;
    let mut records = vec![T::zeroed(); count];
    bytemuck::cast_slice_mut::<T, u8>(&mut records).copy_from_slice(bytes);
    Ok(records)
}

fn read_body<S: Semiring>(r: &mut ByteReader<'_>) -> Result<Fst<S>, WfstError> {
    let flags = r.u32()?;
    let isymbols = if flags & HAS_ISYMBOLS != 0 {
        Some(read_symbols(r)?)
    } else {
        None
    };
    let osymbols = if flags & HAS_OSYMBOLS != 0 {
        Some(read_symbols(r)?)
    } else {
        None
    };

    let start = r.u32()?;
    let num_states = r.u32()? as usize;
    let num_arcs = r.u32()? as usize;
    if start != NO_STATE && start as usize >= num_states {
        return Err(WfstError::Format(format!(
            "start state {start} out of range for {num_states} states"
        )));
    }

    r.align(TABLE_ALIGN)?;
    let state_records: Vec<NativeState> = read_table(r, num_states)?;
    r.align(TABLE_ALIGN)?;
    let arc_records: Vec<NativeArc> = read_table(r, num_arcs)?;
    if r.remaining() != 0 {
        return Err(WfstError::Format(format!(
            "{} trailing bytes after arc table",
            r.remaining()
        )));
    }

    if num_states == 0 && num_arcs != 0 {
        return Err(WfstError::Format(format!("{num_arcs} arcs without states")));
    }
    if state_records.first().is_some_and(|rec| rec.first_arc != 0) {
        return Err(WfstError::Format("arc table does not start at state 0".into()));
    }

    let mut states: Vec<State<S>> = Vec::with_capacity(num_states);
    for (i, rec) in state_records.iter().enumerate() {
        let first = rec.first_arc as usize;
        let end = state_records
            .get(i + 1)
            .map_or(num_arcs, |next| next.first_arc as usize);
        if first > end || end > num_arcs {
            return Err(WfstError::Format(format!(
                "state {i} has invalid arc range {first}..{end}"
            )));
        }
        let final_weight = S::Weight::from_bits(rec.final_weight);
        if !S::is_member(final_weight) {
            return Err(WfstError::InvalidWeight(final_weight.to_f32()));
        }
        let mut state = State::<S>::new();
        state.final_weight = final_weight;
        state.arcs.reserve(end - first);
        for rec in &arc_records[first..end] {
            if rec.nextstate as usize >= num_states {
                return Err(WfstError::Format(format!(
                    "arc from state {i} targets state {} out of range",
                    rec.nextstate
                )));
            }
            let arc = rec.to_arc::<S>();
            if !S::is_member(arc.weight) {
                return Err(WfstError::InvalidWeight(arc.weight.to_f32()));
            }
            state.arcs.push(arc);
        }
        states.push(state);
    }

    let mut fst = Fst::<S>::new();
    fst.replace_states(states, (start != NO_STATE).then_some(start as StateId));
    fst.set_input_symbols(isymbols);
    fst.set_output_symbols(osymbols);

    tracing::debug!(
        semiring = S::name(),
        states = fst.num_states(),
        arcs = fst.num_arcs(),
        "loaded native fst"
    );
    Ok(fst)
}

fn write_symbols(out: &mut Vec<u8>, table: &SymbolTable) -> Result<(), WfstError> {
    put_string_u32(out, table.name());
    put_i64(out, table.available_key());
    put_u32(out, count_u32(table.len(), "symbols")?);
    for (symbol, key) in table.iter() {
        put_string_u32(out, symbol);
        put_i64(out, key);
    }
    Ok(())
}

fn count_u32(n: usize, what: &str) -> Result<u32, WfstError> {
    u32::try_from(n).map_err(|_| WfstError::Format(format!("too many {what} ({n})")))
}

/// Serialize `fst`.
pub fn write<S: Semiring>(fst: &Fst<S>) -> Result<Vec<u8>, WfstError> {
    let num_states = count_u32(fst.num_states(), "states")?;
    let num_arcs = count_u32(fst.num_arcs(), "arcs")?;

    let mut out = Vec::with_capacity(
        HEADER_SIZE
            + 64
            + num_states as usize * size_of::<NativeState>()
            + num_arcs as usize * size_of::<NativeArc>(),
    );
    put_u32(&mut out, COOKIE1);
    put_u32(&mut out, COOKIE2);
    put_u32(&mut out, VERSION);
    put_u32(&mut out, S::KIND.tag());

    let mut flags = 0;
    if fst.input_symbols().is_some() {
        flags |= HAS_ISYMBOLS;
    }
    if fst.output_symbols().is_some() {
        flags |= HAS_OSYMBOLS;
    }
    put_u32(&mut out, flags);
    if let Some(table) = fst.input_symbols() {
        write_symbols(&mut out, table)?;
    }
    if let Some(table) = fst.output_symbols() {
        write_symbols(&mut out, table)?;
    }

    put_u32(&mut out, fst.start().unwrap_or(NO_STATE));
    put_u32(&mut out, num_states);
    put_u32(&mut out, num_arcs);

    pad_to(&mut out, TABLE_ALIGN);
    let mut first_arc = 0u32;
    for state in fst.states() {
        let rec = NativeState {
            final_weight: state.final_weight.to_bits(),
            first_arc,
        };
        out.extend_from_slice(bytemuck::bytes_of(&rec));
        first_arc += state.arcs.len() as u32;
    }

    pad_to(&mut out, TABLE_ALIGN);
    for state in fst.states() {
        for arc in &state.arcs {
            out.extend_from_slice(bytemuck::bytes_of(&NativeArc::from_arc(arc)));
        }
    }
    Ok(out)
}
