use super::FemState;
use crate::base::Domain;
use crate::StrError;
use std::fs;

/// Defines the default output directory
pub const DEFAULT_OUT_DIR: &str = "/tmp/stsim/results";

/// Assists in generating output files
///
/// Writes the domain once and a numbered series of state checkpoints (one per
/// accepted step), all as JSON through serde.
pub struct FileIo {
    /// Holds a flag to enable/disable the file generation
    enabled: bool,

    /// Defines the output directory
    output_dir: String,

    /// Defines the filename stem
    filename_stem: String,

    /// Holds the count of files written
    output_count: usize,

    /// Holds the indices of the output files
    pub indices: Vec<usize>,

    /// Holds the pseudo-times corresponding to each output file
    pub times: Vec<f64>,
}

impl FileIo {
    /// Allocates a new instance with deactivated generation of files
    pub fn new() -> Self {
        FileIo {
            enabled: false,
            output_dir: String::new(),
            filename_stem: String::new(),
            output_count: 0,
            indices: Vec::new(),
            times: Vec::new(),
        }
    }

    /// Allocates a new instance writing to the given directory
    ///
    /// # Input
    ///
    /// * `filename_stem` -- the last part of the filename without extension, e.g., "my_simulation"
    /// * `output_directory` -- the directory to save the output files.
    ///   None means that the default directory will be used; see [DEFAULT_OUT_DIR]
    pub fn new_enabled(filename_stem: &str, output_directory: Option<&str>) -> Result<Self, StrError> {
        let output_dir = match output_directory {
            Some(directory) => directory.to_string(),
            None => DEFAULT_OUT_DIR.to_string(),
        };
        fs::create_dir_all(&output_dir).map_err(|_| "cannot create output directory")?;
        Ok(FileIo {
            enabled: true,
            output_dir,
            filename_stem: filename_stem.to_string(),
            output_count: 0,
            indices: Vec::new(),
            times: Vec::new(),
        })
    }

    /// Returns the path of the domain file
    pub fn path_domain(&self) -> String {
        format!("{}/{}-domain.json", self.output_dir, self.filename_stem)
    }

    /// Returns the path of the state file with the given index
    pub fn path_state(&self, index: usize) -> String {
        format!("{}/{}-{:0>20}.json", self.output_dir, self.filename_stem, index)
    }

    /// Writes the domain file (once per analysis)
    pub fn write_domain(&self, domain: &Domain) -> Result<(), StrError> {
        if !self.enabled {
            return Ok(());
        }
        domain.write_json(&self.path_domain())
    }

    /// Writes a state checkpoint and records its index and pseudo-time
    pub fn write_state(&mut self, state: &FemState) -> Result<(), StrError> {
        if !self.enabled {
            return Ok(());
        }
        state.write_json(&self.path_state(self.output_count))?;
        self.indices.push(self.output_count);
        self.times.push(state.t);
        self.output_count += 1;
        Ok(())
    }

    /// Reads a state checkpoint given its index
    pub fn read_state(&self, index: usize) -> Result<FemState, StrError> {
        FemState::read_json(&self.path_state(index))
    }

    /// Reads back the domain file
    pub fn read_domain(&self) -> Result<Domain, StrError> {
        Domain::read_json(&self.path_domain())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
