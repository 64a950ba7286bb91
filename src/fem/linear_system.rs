use super::AnalysisModel;
use crate::base::Config;
use crate::StrError;
use russell_lab::Vector;
use russell_sparse::{LinSolver, SparseMatrix};

/// Holds variables to solve the global linear system
///
/// **Notes:**
///
/// 1. The global matrix is sparse with the number of nonzero values indicated by `nnz`
/// 2. The local matrices add only to parts of the global matrix yielding a banded matrix
/// 3. The least upper bound (supremum) of nnz equals the sum of all the number
///    of entries in the local matrices, i.e., `nnz ≤ Σ (n_local × n_local)`;
///    repeated (equation, equation) couples are summed by the triplet format
/// 4. Under the Lagrange handler the system is symmetric indefinite; the
///    chosen solver must tolerate it (LU-type solvers do)
pub struct LinearSystem<'a> {
    /// Total number of global equations
    pub n_equation: usize,

    /// Holds the supremum of the number of nonzero values (nnz) in the global matrix
    pub nnz_sup: usize,

    /// Only the lower triangle of the global matrix is assembled
    pub triangular: bool,

    /// Holds the global unbalance vector R
    pub rr: Vector,

    /// Holds the global tangent matrix K
    pub kk: SparseMatrix,

    /// Holds the linear solver
    pub solver: LinSolver<'a>,

    /// Holds the "minus-delta-U" vector (the solution of the linear system)
    pub mdu: Vector,
}

impl<'a> LinearSystem<'a> {
    /// Allocates a new instance
    pub fn new(model: &AnalysisModel, config: &Config) -> Result<Self, StrError> {
        let n_equation = model.n_equation;
        if n_equation < 1 {
            return Err("cannot allocate the linear system before numbering completes");
        }

        // check if all local tangent matrices are symmetric
        let symmetric = if config.ignore_tangent_symmetry {
            false
        } else {
            model.fes.iter().all(|fe| fe.actual.symmetric_tangent())
        };

        // estimate the number of non-zero values
        let sym = config.lin_sol_genie.get_sym(symmetric);
        let triangular = sym.triangular();
        let nnz_sup = model.fes.iter().fold(0, |acc, fe| {
            let n = fe.actual.n_local_eq();
            if triangular {
                acc + (n * n + n) / 2
            } else {
                acc + n * n
            }
        });

        // allocate new instance
        Ok(LinearSystem {
            n_equation,
            nnz_sup,
            triangular,
            rr: Vector::new(n_equation),
            kk: SparseMatrix::new_coo(n_equation, n_equation, nnz_sup, sym)?,
            solver: LinSolver::new(config.lin_sol_genie)?,
            mdu: Vector::new(n_equation),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
