use crate::StrError;
use russell_lab::{vec_copy, Vector};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds the state of an analysis
///
/// The primary unknowns are indexed by global equation number; the vector
/// therefore spans physical DOFs and, under the Lagrange handler, the
/// multiplier unknowns numbered after them.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FemState {
    /// Pseudo-time
    pub t: f64,

    /// Pseudo-time increment
    pub dt: f64,

    /// Primary unknowns {U} (n_equation)
    pub uu: Vector,

    /// Cumulated (for one step) primary unknowns {ΔU} (n_equation)
    pub duu: Vector,

    /// Committed primary unknowns (n_equation)
    uu_committed: Vector,

    /// Committed pseudo-time
    t_committed: f64,
}

impl FemState {
    /// Allocates a new instance with zeroed unknowns
    pub fn new(n_equation: usize) -> Result<Self, StrError> {
        if n_equation < 1 {
            return Err("n_equation must be ≥ 1");
        }
        Ok(FemState {
            t: 0.0,
            dt: 0.0,
            uu: Vector::new(n_equation),
            duu: Vector::new(n_equation),
            uu_committed: Vector::new(n_equation),
            t_committed: 0.0,
        })
    }

    /// Returns the total number of equations
    pub fn n_equation(&self) -> usize {
        self.uu.dim()
    }

    /// Commits the current primary unknowns
    pub fn commit(&mut self) {
        vec_copy(&mut self.uu_committed, &self.uu).unwrap();
        self.t_committed = self.t;
    }

    /// Reverts the primary unknowns to the last committed values
    pub fn revert_to_last_commit(&mut self) {
        vec_copy(&mut self.uu, &self.uu_committed).unwrap();
        self.duu.fill(0.0);
        self.t = self.t_committed;
    }

    /// Reads a JSON file containing the state data
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let data = File::open(path).map_err(|_| "cannot open state file")?;
        let buffered = BufReader::new(data);
        let state = serde_json::from_reader(buffered).map_err(|_| "cannot parse state file")?;
        Ok(state)
    }

    /// Writes a JSON file with the state data
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create state file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write state file")?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::FemState;

    #[test]
    fn new_captures_errors() {
        assert_eq!(FemState::new(0).err(), Some("n_equation must be ≥ 1"));
    }

    #[test]
    fn commit_and_revert_work() {
        let mut state = FemState::new(3).unwrap();
        state.uu[0] = 1.0;
        state.t = 0.5;
        state.commit();
        state.uu[0] = 9.0;
        state.uu[2] = 7.0;
        state.duu[2] = 7.0;
        state.t = 1.0;
        state.revert_to_last_commit();
        assert_eq!(state.uu.as_data(), &[1.0, 0.0, 0.0]);
        assert_eq!(state.duu.as_data(), &[0.0, 0.0, 0.0]);
        assert_eq!(state.t, 0.5);
    }

    #[test]
    fn write_and_read_json_work() {
        let mut state = FemState::new(2).unwrap();
        state.uu[1] = -3.0;
        state.t = 2.0;
        let path = "/tmp/stsim/test_fem_state.json";
        state.write_json(path).unwrap();
        let back = FemState::read_json(path).unwrap();
        assert_eq!(back.uu.as_data(), &[0.0, -3.0]);
        assert_eq!(back.t, 2.0);
        assert_eq!(FemState::read_json("/tmp/stsim/__nope__.json").err(), Some("cannot open state file"));
    }
}
