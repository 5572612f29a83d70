// OpenFST vector binary format: import and bit-compatible export.

use crate::WfstError;
use crate::arc::{Arc, Label, StateId};
use crate::fst::{AnyFst, Fst, mismatch};
use crate::io::bytes::{
    ByteReader, put_f32_bits, put_i32, put_i64, put_string_i32, put_u64,
};
use crate::semiring::{
    LogSemiring, ProbabilitySemiring, Semiring, SemiringKind, TropicalSemiring, Weight,
};
use crate::state::State;
use crate::symbols::{SymbolTable, SymbolTableRef};

/// Magic number opening every FST file.
pub const FST_MAGIC: i32 = 2_125_659_606;
/// Magic number opening every embedded symbol table.
pub const SYMBOL_TABLE_MAGIC: i32 = 2_125_658_996;

/// The only container type this codec reads and writes.
pub const FST_TYPE: &str = "vector";
pub const FILE_VERSION: i32 = 2;

const HAS_ISYMBOLS: i32 = 0x1;
const HAS_OSYMBOLS: i32 = 0x2;
const IS_ALIGNED: i32 = 0x4;

/// Smallest encoding of one state: final weight plus arc count.
const MIN_STATE_BYTES: usize = 4 + 8;

/// Parsed file header.
///
/// Layout (all little-endian):
/// - i32 magic, string fst type, string arc type
/// - i32 version, i32 flags, u64 properties
/// - i64 start (-1 when there is none), i64 state count, i64 arc count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstHeader {
    pub fst_type: String,
    pub arc_type: String,
    pub version: i32,
    pub flags: i32,
    pub properties: u64,
    pub start: i64,
    pub num_states: i64,
    pub num_arcs: i64,
}

/// True when `data` starts with the FST magic number.
pub fn is_openfst(data: &[u8]) -> bool {
    data.len() >= 4 && i32::from_le_bytes([data[0], data[1], data[2], data[3]]) == FST_MAGIC
}

/// Parse and validate the header at the start of `data`.
pub fn parse_header(data: &[u8]) -> Result<FstHeader, WfstError> {
    read_header(&mut ByteReader::new(data))
}

fn read_header(r: &mut ByteReader<'_>) -> Result<FstHeader, WfstError> {
    let magic = r.i32()?;
    if magic != FST_MAGIC {
        return Err(WfstError::Format(format!("bad FST magic number {magic}")));
    }
    let header = FstHeader {
        fst_type: r.string_i32()?,
        arc_type: r.string_i32()?,
        version: r.i32()?,
        flags: r.i32()?,
        properties: r.u64()?,
        start: r.i64()?,
        num_states: r.i64()?,
        num_arcs: r.i64()?,
    };

    if header.fst_type != FST_TYPE {
        return Err(WfstError::Format(format!(
            "unsupported fst type {:?}",
            header.fst_type
        )));
    }
    if header.version != FILE_VERSION {
        return Err(WfstError::UnsupportedVersion {
            found: header.version.into(),
            supported: FILE_VERSION.into(),
        });
    }
    if header.flags & IS_ALIGNED != 0 {
        return Err(WfstError::Format("aligned files are not supported".into()));
    }
    if header.num_states < 0 || header.num_arcs < 0 {
        return Err(WfstError::Format(format!(
            "negative counts in header ({} states, {} arcs)",
            header.num_states, header.num_arcs
        )));
    }
    if header.start != -1 && !(0..header.num_states).contains(&header.start) {
        return Err(WfstError::Format(format!(
            "start state {} out of range for {} states",
            header.start, header.num_states
        )));
    }
    Ok(header)
}

fn arc_kind(header: &FstHeader) -> Result<SemiringKind, WfstError> {
    SemiringKind::from_arc_type(&header.arc_type)
        .ok_or_else(|| WfstError::Format(format!("unknown arc type {:?}", header.arc_type)))
}

/// Import an automaton over `S`. An arc type naming another semiring is a
/// [`WfstError::SemiringMismatch`].
pub fn read<S: Semiring>(data: &[u8]) -> Result<Fst<S>, WfstError> {
    let mut r = ByteReader::new(data);
    let header = read_header(&mut r)?;
    let kind = arc_kind(&header)?;
    if kind != S::KIND {
        return Err(mismatch(S::KIND, kind));
    }
    read_body(&mut r, &header)
}

/// Import an automaton whose semiring is taken from the header's arc type.
pub fn read_any(data: &[u8]) -> Result<AnyFst, WfstError> {
    let mut r = ByteReader::new(data);
    let header = read_header(&mut r)?;
    match arc_kind(&header)? {
        SemiringKind::Tropical => read_body::<TropicalSemiring>(&mut r, &header).map(AnyFst::from),
        SemiringKind::Log => read_body::<LogSemiring>(&mut r, &header).map(AnyFst::from),
        SemiringKind::Probability => {
            read_body::<ProbabilitySemiring>(&mut r, &header).map(AnyFst::from)
        }
    }
}

fn read_symbols(r: &mut ByteReader<'_>) -> Result<SymbolTableRef, WfstError> {
    let magic = r.i32()?;
    if magic != SYMBOL_TABLE_MAGIC {
        return Err(WfstError::Format(format!(
            "bad symbol table magic number {magic}"
        )));
    }
    let name = r.string_i32()?;
    let available_key = r.i64()?;
    let size = r.i64()?;
    if size < 0 {
        return Err(WfstError::Format(format!("negative symbol table size {size}")));
    }
    let mut table = SymbolTable::new(name);
    for _ in 0..size {
        let symbol = r.string_i32()?;
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

fn label(raw: i32, table: Option<&SymbolTableRef>, side: &str) -> Result<Label, WfstError> {
    let out_of_range = || WfstError::Format(format!("{side} label {raw} out of range"));
    let label = Label::try_from(raw).map_err(|_| out_of_range())?;
    match table {
        Some(t) if i64::from(label) >= t.available_key() => Err(out_of_range()),
        _ => Ok(label),
    }
}

fn weight<S: Semiring>(bits: u32) -> Result<S::Weight, WfstError> {
    let w = S::Weight::from_bits(bits);
    if S::is_member(w) {
        Ok(w)
    } else {
        Err(WfstError::Format(format!(
            "weight {} is not a member of the {} semiring",
            w,
            S::name()
        )))
    }
}

fn read_body<S: Semiring>(
    r: &mut ByteReader<'_>,
    header: &FstHeader,
) -> Result<Fst<S>, WfstError> {
    let isymbols = if header.flags & HAS_ISYMBOLS != 0 {
        Some(read_symbols(r)?)
    } else {
        None
    };
    let osymbols = if header.flags & HAS_OSYMBOLS != 0 {
        Some(read_symbols(r)?)
    } else {
        None
    };

    let num_states = header.num_states as usize;
    if num_states > StateId::MAX as usize {
        return Err(WfstError::Format(format!("too many states ({num_states})")));
    }
    let mut states: Vec<State<S>> = Vec::with_capacity(num_states.min(r.remaining() / MIN_STATE_BYTES));
    let mut total_arcs: i64 = 0;

    for s in 0..num_states {
        let mut state = State::<S>::new();
        state.final_weight = weight::<S>(r.f32()?.to_bits())?;
        let narcs = r.i64()?;
        if narcs < 0 {
            return Err(WfstError::Format(format!(
                "negative arc count {narcs} at state {s}"
            )));
        }
        for _ in 0..narcs {
            let ilabel = label(r.i32()?, isymbols.as_ref(), "input")?;
            let olabel = label(r.i32()?, osymbols.as_ref(), "output")?;
            let w = weight::<S>(r.f32()?.to_bits())?;
            let next = r.i32()?;
            let nextstate = StateId::try_from(next)
                .ok()
                .filter(|&d| (d as usize) < num_states)
                .ok_or_else(|| {
                    WfstError::Format(format!(
                        "arc from state {s} targets state {next} out of range"
                    ))
                })?;
            state.arcs.push(Arc::new(ilabel, olabel, w, nextstate));
        }
        total_arcs += narcs;
        states.push(state);
    }

    if total_arcs != header.num_arcs {
        return Err(WfstError::Format(format!(
            "header declares {} arcs, found {total_arcs}",
            header.num_arcs
        )));
    }
    if r.remaining() != 0 {
        return Err(WfstError::Format(format!(
            "{} trailing bytes after last state",
            r.remaining()
        )));
    }

    let start = (header.start >= 0).then_some(header.start as StateId);
    let mut fst = Fst::<S>::new();
    fst.replace_states(states, start);
    fst.set_input_symbols(isymbols);
    fst.set_output_symbols(osymbols);
    fst.set_stored_properties(header.properties);

    tracing::debug!(
        arc_type = %header.arc_type,
        states = fst.num_states(),
        arcs = fst.num_arcs(),
        "imported OpenFST binary"
    );
    Ok(fst)
}

fn write_symbols(out: &mut Vec<u8>, table: &SymbolTable) {
    put_i32(out, SYMBOL_TABLE_MAGIC);
    put_string_i32(out, table.name());
    put_i64(out, table.available_key());
    put_i64(out, table.len() as i64);
    for (symbol, key) in table.iter() {
        put_string_i32(out, symbol);
        put_i64(out, key);
    }
}

fn encode_label(label: Label) -> Result<i32, WfstError> {
    i32::try_from(label)
        .map_err(|_| WfstError::Format(format!("label {label} does not fit the format")))
}

/// Export `fst`.
///
/// The property word is the one read at import while the automaton is
/// unmodified, so importing and exporting a file reproduces it byte for byte.
pub fn write<S: Semiring>(fst: &Fst<S>) -> Result<Vec<u8>, WfstError> {
    if fst.num_states() > i32::MAX as usize {
        return Err(WfstError::Format(format!(
            "too many states for the format ({})",
            fst.num_states()
        )));
    }
    let mut flags = 0;
    if fst.input_symbols().is_some() {
        flags |= HAS_ISYMBOLS;
    }
    if fst.output_symbols().is_some() {
        flags |= HAS_OSYMBOLS;
    }

    let num_arcs = fst.num_arcs();
    let mut out = Vec::with_capacity(128 + fst.num_states() * MIN_STATE_BYTES + num_arcs * 16);
    put_i32(&mut out, FST_MAGIC);
    put_string_i32(&mut out, FST_TYPE);
    put_string_i32(&mut out, S::KIND.arc_type());
    put_i32(&mut out, FILE_VERSION);
    put_i32(&mut out, flags);
    put_u64(
        &mut out,
        fst.stored_properties().unwrap_or_else(|| fst.properties()),
    );
    put_i64(&mut out, fst.start().map_or(-1, i64::from));
    put_i64(&mut out, fst.num_states() as i64);
    put_i64(&mut out, num_arcs as i64);

    if let Some(table) = fst.input_symbols() {
        write_symbols(&mut out, table);
    }
    if let Some(table) = fst.output_symbols() {
        write_symbols(&mut out, table);
    }

    for state in fst.states() {
        put_f32_bits(&mut out, state.final_weight.to_bits());
        put_i64(&mut out, state.arcs.len() as i64);
        for arc in &state.arcs {
            put_i32(&mut out, encode_label(arc.ilabel)?);
            put_i32(&mut out, encode_label(arc.olabel)?);
            put_f32_bits(&mut out, arc.weight.to_bits());
            put_i32(&mut out, arc.nextstate as i32);
        }
    }
    Ok(out)
}
