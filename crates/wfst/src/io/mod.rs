// Codecs and the path-level load/save surface.
//
// Every function reads or writes a whole file through a handle scoped to the
// call; a parse failure returns an error and no automaton.

pub(crate) mod bytes;
pub mod native;
pub mod openfst;
pub mod records;
pub mod text;

use crate::WfstError;
use crate::fst::{AnyFst, Fst};
use crate::semiring::Semiring;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Binary file formats recognized by [`load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Native,
    OpenFst,
}

/// Identify the format of a file from its leading magic bytes.
pub fn detect(data: &[u8]) -> Option<FileFormat> {
    if native::is_native(data) {
        Some(FileFormat::Native)
    } else if openfst::is_openfst(data) {
        Some(FileFormat::OpenFst)
    } else {
        None
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, WfstError> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), WfstError> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(data)?;
    out.flush()?;
    Ok(())
}

fn unknown_format(path: &Path) -> WfstError {
    WfstError::Format(format!("{}: not a native or OpenFST file", path.display()))
}

/// Load an automaton over `S` from a native or OpenFST binary file.
pub fn load<S: Semiring>(path: impl AsRef<Path>) -> Result<Fst<S>, WfstError> {
    let path = path.as_ref();
    let data = read_file(path)?;
    let fst = match detect(&data) {
        Some(FileFormat::Native) => native::read(&data)?,
        Some(FileFormat::OpenFst) => openfst::read(&data)?,
        None => return Err(unknown_format(path)),
    };
    tracing::debug!(path = %path.display(), states = fst.num_states(), "loaded fst");
    Ok(fst)
}

/// Load an automaton whose semiring is read from the file.
pub fn load_any(path: impl AsRef<Path>) -> Result<AnyFst, WfstError> {
    let path = path.as_ref();
    let data = read_file(path)?;
    match detect(&data) {
        Some(FileFormat::Native) => native::read_any(&data),
        Some(FileFormat::OpenFst) => openfst::read_any(&data),
        None => Err(unknown_format(path)),
    }
}

/// Save `fst` in the native format.
pub fn save<S: Semiring>(fst: &Fst<S>, path: impl AsRef<Path>) -> Result<(), WfstError> {
    write_file(path.as_ref(), &native::write(fst)?)
}

/// Export `fst` as an OpenFST vector binary file.
pub fn export<S: Semiring>(fst: &Fst<S>, path: impl AsRef<Path>) -> Result<(), WfstError> {
    write_file(path.as_ref(), &openfst::write(fst)?)
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Import `<base>.fst.txt` in AT&T text form, with symbols from
/// `<base>.input.syms` and `<base>.output.syms` when those files exist.
pub fn import_text<S: Semiring>(base: impl AsRef<Path>) -> Result<Fst<S>, WfstError> {
    let base = base.as_ref();
    let load_symbols = |suffix: &str, name: &str| -> Result<_, WfstError> {
        let path = with_suffix(base, suffix);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(std::sync::Arc::new(text::read_symbols(&data, name)?)))
    };
    let isymbols = load_symbols(".input.syms", "isyms")?;
    let osymbols = load_symbols(".output.syms", "osyms")?;
    let data = std::fs::read_to_string(with_suffix(base, ".fst.txt"))?;
    text::read_text(&data, isymbols, osymbols)
}

/// Write `fst` as `<base>.fst.txt` plus one symbol file per attached table.
pub fn export_text<S: Semiring>(fst: &Fst<S>, base: impl AsRef<Path>) -> Result<(), WfstError> {
    let base = base.as_ref();
    if let Some(table) = fst.input_symbols() {
        write_file(
            &with_suffix(base, ".input.syms"),
            text::write_symbols(table).as_bytes(),
        )?;
    }
    if let Some(table) = fst.output_symbols() {
        write_file(
            &with_suffix(base, ".output.syms"),
            text::write_symbols(table).as_bytes(),
        )?;
    }
    write_file(
        &with_suffix(base, ".fst.txt"),
        text::write_text(fst)?.as_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::Arc;
    use crate::semiring::{LogSemiring, SemiringKind, TropicalSemiring};

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wfst-io-{}-{name}", std::process::id()))
    }

    fn sample() -> Fst<LogSemiring> {
        let mut fst = Fst::<LogSemiring>::new();
        let s0 = fst.new_state();
        let s1 = fst.new_state();
        fst.set_start(s0).unwrap();
        fst.set_final(s1, 0.5).unwrap();
        fst.add_arc(s0, Arc::new(1, 1, 2.0, s1)).unwrap();
        fst
    }

    #[test]
    fn save_and_load_native() {
        let path = scratch("native.fst");
        save(&sample(), &path).unwrap();
        let back: Fst<LogSemiring> = load(&path).unwrap();
        assert_eq!(back, sample());
        assert_eq!(load_any(&path).unwrap().kind(), SemiringKind::Log);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn export_and_load_openfst() {
        let path = scratch("openfst.fst");
        export(&sample(), &path).unwrap();
        let data = std::fs::read(&path).unwrap();
        assert_eq!(detect(&data), Some(FileFormat::OpenFst));
        let back: Fst<LogSemiring> = load(&path).unwrap();
        assert_eq!(back, sample());
        let err = load::<TropicalSemiring>(&path).unwrap_err();
        assert!(matches!(err, WfstError::SemiringMismatch { .. }));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unknown_file_is_format_error() {
        let path = scratch("garbage.bin");
        std::fs::write(&path, b"definitely not an fst").unwrap();
        assert!(matches!(load_any(&path), Err(WfstError::Format(_))));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load::<TropicalSemiring>(scratch("does-not-exist")).unwrap_err();
        assert!(matches!(err, WfstError::Io(_)));
    }

    #[test]
    fn text_export_round_trip() {
        let base = scratch("text");
        let mut fst = Fst::<TropicalSemiring>::new();
        let s0 = fst.new_state();
        let s1 = fst.new_state();
        fst.set_start(s0).unwrap();
        fst.set_final(s1, 0.0).unwrap();
        fst.add_arc(s0, Arc::new(1, 2, 1.0, s1)).unwrap();
        let mut syms = crate::SymbolTable::with_epsilon("syms");
        syms.add_symbol("a");
        syms.add_symbol("b");
        let syms = std::sync::Arc::new(syms);
        fst.set_input_symbols(Some(syms.clone()));
        fst.set_output_symbols(Some(syms));

        export_text(&fst, &base).unwrap();
        let back: Fst<TropicalSemiring> = import_text(&base).unwrap();
        assert_eq!(back, fst);
        assert_eq!(back.input_symbols().unwrap().find_key("b"), Some(2));
        for suffix in [".fst.txt", ".input.syms", ".output.syms"] {
            std::fs::remove_file(with_suffix(&base, suffix)).unwrap();
        }
    }
}
