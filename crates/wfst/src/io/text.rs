// AT&T text format: tab-separated arc and final-state lines, plus symbol files.

use crate::WfstError;
use crate::arc::{Arc, Label, StateId};
use crate::config::Limits;
use crate::fst::Fst;
use crate::semiring::Semiring;
use crate::symbols::{SymbolTable, SymbolTableRef};
use std::fmt::Write as _;

fn line_error(line: usize, msg: impl std::fmt::Display) -> WfstError {
    WfstError::Format(format!("line {line}: {msg}"))
}

/// Parse a symbol file of `symbol key` lines.
pub fn read_symbols(text: &str, name: &str) -> Result<SymbolTable, WfstError> {
    let mut table = SymbolTable::new(name);
    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let mut fields = line.split_whitespace();
        let Some(symbol) = fields.next() else {
            continue;
        };
        let key = fields
            .next()
            .ok_or_else(|| line_error(lineno, "missing key"))?;
        if fields.next().is_some() {
            return Err(line_error(lineno, "expected `symbol key`"));
        }
        let key: i64 = key
            .parse()
            .map_err(|_| line_error(lineno, format!("invalid key {key:?}")))?;
        if table.add_symbol_with_key(symbol, key) != Some(key) {
            return Err(line_error(
                lineno,
                format!("{symbol:?} = {key} conflicts with an earlier entry"),
            ));
        }
    }
    Ok(table)
}

/// Render a symbol table as `symbol\tkey` lines in insertion order.
pub fn write_symbols(table: &SymbolTable) -> String {
    let mut out = String::new();
    for (symbol, key) in table.iter() {
        let _ = writeln!(out, "{symbol}\t{key}");
    }
    out
}

fn parse_state(field: &str, line: usize, max_states: usize) -> Result<StateId, WfstError> {
    let state = field
        .parse::<StateId>()
        .ok()
        .filter(|&s| s != crate::arc::NO_STATE)
        .ok_or_else(|| line_error(line, format!("invalid state {field:?}")))?;
    if state as usize >= max_states {
        return Err(line_error(
            line,
            format!("state {state} exceeds the limit of {max_states} states"),
        ));
    }
    Ok(state)
}

fn parse_label(
    field: &str,
    symbols: Option<&SymbolTableRef>,
    line: usize,
) -> Result<Label, WfstError> {
    match symbols {
        Some(table) => table
            .find_label(field)
            .ok_or_else(|| line_error(line, format!("unknown symbol {field:?}"))),
        None => field
            .parse::<Label>()
            .map_err(|_| line_error(line, format!("invalid label {field:?}"))),
    }
}

fn parse_weight<S: Semiring>(field: Option<&str>, line: usize) -> Result<S::Weight, WfstError> {
    let Some(field) = field else {
        return Ok(S::one());
    };
    let w: S::Weight = field
        .parse()
        .map_err(|_| line_error(line, format!("invalid weight {field:?}")))?;
    if S::is_member(w) {
        Ok(w)
    } else {
        Err(line_error(
            line,
            format!("weight {field} is not a member of the {} semiring", S::name()),
        ))
    }
}

fn ensure_state<S: Semiring>(fst: &mut Fst<S>, state: StateId) {
    while fst.num_states() <= state as usize {
        fst.new_state();
    }
}

/// Parse an automaton in AT&T text form.
///
/// Arc lines are `src dst ilabel olabel [weight]`, final lines
/// `state [weight]`; a missing weight is `one()`. The source of the first line
/// is the start state. Labels are looked up in the given symbol tables, or
/// read as integers when a table is absent; the tables are attached to the
/// result. State ids must stay below [`Limits::max_states`] of the default
/// limits.
pub fn read_text<S: Semiring>(
    text: &str,
    isymbols: Option<SymbolTableRef>,
    osymbols: Option<SymbolTableRef>,
) -> Result<Fst<S>, WfstError> {
    read_text_with(text, isymbols, osymbols, &Limits::default())
}

/// [`read_text`] with explicit limits; a state id of `limits.max_states` or
/// more is a [`WfstError::Format`] error.
pub fn read_text_with<S: Semiring>(
    text: &str,
    isymbols: Option<SymbolTableRef>,
    osymbols: Option<SymbolTableRef>,
    limits: &Limits,
) -> Result<Fst<S>, WfstError> {
    let max_states = limits.max_states;
    let mut fst = Fst::<S>::new();
    let mut start: Option<StateId> = None;

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.len() {
            0 => continue,
            1 | 2 => {
                let s = parse_state(fields[0], lineno, max_states)?;
                let w = parse_weight::<S>(fields.get(1).copied(), lineno)?;
                ensure_state(&mut fst, s);
                fst.set_final(s, w)?;
                start.get_or_insert(s);
            }
            4 | 5 => {
                let src = parse_state(fields[0], lineno, max_states)?;
                let dst = parse_state(fields[1], lineno, max_states)?;
                let ilabel = parse_label(fields[2], isymbols.as_ref(), lineno)?;
                let olabel = parse_label(fields[3], osymbols.as_ref(), lineno)?;
                let w = parse_weight::<S>(fields.get(4).copied(), lineno)?;
                ensure_state(&mut fst, src.max(dst));
                fst.add_arc(src, Arc::new(ilabel, olabel, w, dst))?;
                start.get_or_insert(src);
            }
            n => return Err(line_error(lineno, format!("expected 1, 2, 4 or 5 fields, got {n}"))),
        }
    }

    if let Some(s) = start {
        fst.set_start(s)?;
    }
    fst.set_input_symbols(isymbols);
    fst.set_output_symbols(osymbols);
    Ok(fst)
}

fn label_text(label: Label, symbols: Option<&SymbolTableRef>) -> Result<String, WfstError> {
    match symbols {
        Some(table) => table
            .label_symbol(label)
            .map(str::to_string)
            .ok_or_else(|| WfstError::Format(format!("label {label} missing from symbol table"))),
        None => Ok(label.to_string()),
    }
}

/// Render `fst` in AT&T text form, start state first.
///
/// Weights equal to `one()` are omitted. States without arcs that are not
/// final produce no line, except the start state, which is written with a
/// `zero()` final weight so that it survives a round trip.
pub fn write_text<S: Semiring>(fst: &Fst<S>) -> Result<String, WfstError> {
    let mut out = String::new();
    let Some(start) = fst.start() else {
        return Ok(out);
    };
    let order = std::iter::once(start).chain((0..fst.num_states() as StateId).filter(|&s| s != start));
    for s in order {
        for arc in fst.arcs(s) {
            let il = label_text(arc.ilabel, fst.input_symbols())?;
            let ol = label_text(arc.olabel, fst.output_symbols())?;
            let _ = write!(out, "{s}\t{}\t{il}\t{ol}", arc.nextstate);
            if arc.weight != S::one() {
                let _ = write!(out, "\t{}", arc.weight);
            }
            out.push('\n');
        }
        let fw = fst.final_weight(s);
        if fw == S::one() {
            let _ = writeln!(out, "{s}");
        } else if fw != S::zero() || (s == start && fst.arcs(s).is_empty()) {
            let _ = writeln!(out, "{s}\t{fw}");
        }
    }
    Ok(out)
}
