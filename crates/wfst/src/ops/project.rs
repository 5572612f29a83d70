// Project: collapse a transducer onto one of its tapes.

use crate::fst::Fst;
use crate::semiring::Semiring;

/// Which tape [`project`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Input,
    Output,
}

/// Build the acceptor obtained by copying the selected label of every arc onto
/// both tapes. The selected symbol table is used for both sides of the result.
pub fn project<S: Semiring>(fst: &Fst<S>, side: ProjectType) -> Fst<S> {
    let mut res = fst.clone();
    for s in 0..res.num_states() as u32 {
        for arc in res.arcs_mut(s) {
            match side {
                ProjectType::Input => arc.olabel = arc.ilabel,
                ProjectType::Output => arc.ilabel = arc.olabel,
            }
        }
    }
    let symbols = match side {
        ProjectType::Input => fst.input_symbols().cloned(),
        ProjectType::Output => fst.output_symbols().cloned(),
    };
    res.set_input_symbols(symbols.clone());
    res.set_output_symbols(symbols);
    res
}
