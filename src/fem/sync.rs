use super::{DofGroup, FeElement};
use crate::base::{Dof, MpConstraint, MrmpConstraint, NodalLoad, Node, SpConstraint};
use crate::StrError;
use russell_lab::{Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Holds the tagged integer/double block exchanged for one object
///
/// This is the boundary-exchange and checkpointing contract: every object of
/// the data model round-trips through one record. Eliminated/unnumbered
/// equation slots are encoded as −1 to keep the block integer-typed.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SyncRecord {
    /// Identification tag of the represented object
    pub tag: usize,

    /// Integer data
    pub ints: Vec<i64>,

    /// Double-precision data
    pub doubles: Vec<f64>,
}

/// Defines the serialization contract of the data-model objects
///
/// A generic (de)serializer moves the records; the objects only declare which
/// fields go in and come out.
pub trait SyncState {
    /// Returns the record representing this object
    fn to_record(&self) -> SyncRecord;

    /// Updates this object from a record
    fn update_from_record(&mut self, record: &SyncRecord) -> Result<(), StrError>;
}

/// Converts an integer back to a DOF type
fn dof_from_i64(value: i64) -> Result<Dof, StrError> {
    match value {
        0 => Ok(Dof::Ux),
        1 => Ok(Dof::Uy),
        2 => Ok(Dof::Uz),
        3 => Ok(Dof::Rx),
        4 => Ok(Dof::Ry),
        5 => Ok(Dof::Rz),
        _ => Err("cannot convert integer to DOF"),
    }
}

impl SyncState for SpConstraint {
    fn to_record(&self) -> SyncRecord {
        SyncRecord {
            tag: self.tag,
            ints: vec![self.node_id as i64, self.dof as i64, self.proportional as i64],
            doubles: vec![self.value],
        }
    }

    fn update_from_record(&mut self, record: &SyncRecord) -> Result<(), StrError> {
        if record.ints.len() != 3 || record.doubles.len() != 1 {
            return Err("record does not match the SpConstraint layout");
        }
        self.tag = record.tag;
        self.node_id = record.ints[0] as usize;
        self.dof = dof_from_i64(record.ints[1])?;
        self.proportional = record.ints[2] != 0;
        self.value = record.doubles[0];
        Ok(())
    }
}

impl SyncState for NodalLoad {
    fn to_record(&self) -> SyncRecord {
        SyncRecord {
            tag: self.tag,
            ints: vec![self.node_id as i64, self.dof as i64, self.proportional as i64],
            doubles: vec![self.value],
        }
    }

    fn update_from_record(&mut self, record: &SyncRecord) -> Result<(), StrError> {
        if record.ints.len() != 3 || record.doubles.len() != 1 {
            return Err("record does not match the NodalLoad layout");
        }
        self.tag = record.tag;
        self.node_id = record.ints[0] as usize;
        self.dof = dof_from_i64(record.ints[1])?;
        self.proportional = record.ints[2] != 0;
        self.value = record.doubles[0];
        Ok(())
    }
}

impl SyncState for Node {
    fn to_record(&self) -> SyncRecord {
        let mut ints = vec![self.ndof() as i64];
        ints.extend(self.dofs.iter().map(|dof| *dof as i64));
        SyncRecord {
            tag: self.id,
            ints,
            doubles: self.coords.clone(),
        }
    }

    fn update_from_record(&mut self, record: &SyncRecord) -> Result<(), StrError> {
        if record.ints.is_empty() {
            return Err("record does not match the Node layout");
        }
        let ndof = record.ints[0] as usize;
        if record.ints.len() != 1 + ndof || record.doubles.is_empty() {
            return Err("record does not match the Node layout");
        }
        self.id = record.tag;
        self.dofs = record.ints[1..]
            .iter()
            .map(|value| dof_from_i64(*value))
            .collect::<Result<Vec<_>, _>>()?;
        self.coords = record.doubles.clone();
        Ok(())
    }
}

impl SyncState for MpConstraint {
    fn to_record(&self) -> SyncRecord {
        let ncon = self.n_constrained();
        let nret = self.n_retained();
        let mut ints = vec![
            self.constrained_node as i64,
            self.retained_node as i64,
            ncon as i64,
            nret as i64,
        ];
        ints.extend(self.constrained_dofs.iter().map(|dof| *dof as i64));
        ints.extend(self.retained_dofs.iter().map(|dof| *dof as i64));
        let mut doubles = Vec::with_capacity(ncon * nret + ncon);
        for i in 0..ncon {
            for j in 0..nret {
                doubles.push(self.cc.get(i, j));
            }
        }
        doubles.extend(self.gg.as_data().iter());
        SyncRecord {
            tag: self.tag,
            ints,
            doubles,
        }
    }

    fn update_from_record(&mut self, record: &SyncRecord) -> Result<(), StrError> {
        if record.ints.len() < 4 {
            return Err("record does not match the MpConstraint layout");
        }
        let ncon = record.ints[2] as usize;
        let nret = record.ints[3] as usize;
        if record.ints.len() != 4 + ncon + nret || record.doubles.len() != ncon * nret + ncon {
            return Err("record does not match the MpConstraint layout");
        }
        self.tag = record.tag;
        self.constrained_node = record.ints[0] as usize;
        self.retained_node = record.ints[1] as usize;
        self.constrained_dofs = record.ints[4..4 + ncon]
            .iter()
            .map(|value| dof_from_i64(*value))
            .collect::<Result<Vec<_>, _>>()?;
        self.retained_dofs = record.ints[4 + ncon..]
            .iter()
            .map(|value| dof_from_i64(*value))
            .collect::<Result<Vec<_>, _>>()?;
        let mut cc = Matrix::new(ncon, nret);
        for i in 0..ncon {
            for j in 0..nret {
                cc.set(i, j, record.doubles[i * nret + j]);
            }
        }
        self.cc = cc;
        self.gg = Vector::from(&&record.doubles[ncon * nret..]);
        Ok(())
    }
}

impl SyncState for MrmpConstraint {
    fn to_record(&self) -> SyncRecord {
        let ncon = self.n_constrained();
        let nret = self.n_retained_total();
        let mut ints = vec![self.constrained_node as i64, ncon as i64];
        ints.extend(self.constrained_dofs.iter().map(|dof| *dof as i64));
        ints.push(self.retained.len() as i64);
        for (node_id, dofs) in &self.retained {
            ints.push(*node_id as i64);
            ints.push(dofs.len() as i64);
            ints.extend(dofs.iter().map(|dof| *dof as i64));
        }
        let mut doubles = Vec::with_capacity(ncon * nret + ncon);
        for i in 0..ncon {
            for j in 0..nret {
                doubles.push(self.cc.get(i, j));
            }
        }
        doubles.extend(self.gg.as_data().iter());
        SyncRecord {
            tag: self.tag,
            ints,
            doubles,
        }
    }

    fn update_from_record(&mut self, record: &SyncRecord) -> Result<(), StrError> {
        if record.ints.len() < 3 {
            return Err("record does not match the MrmpConstraint layout");
        }
        let ncon = record.ints[1] as usize;
        if record.ints.len() < 3 + ncon {
            return Err("record does not match the MrmpConstraint layout");
        }
        let constrained_dofs = record.ints[2..2 + ncon]
            .iter()
            .map(|value| dof_from_i64(*value))
            .collect::<Result<Vec<_>, _>>()?;
        let n_ret_nodes = record.ints[2 + ncon] as usize;
        let mut retained = Vec::with_capacity(n_ret_nodes);
        let mut cursor = 3 + ncon;
        let mut nret = 0;
        for _ in 0..n_ret_nodes {
            if record.ints.len() < cursor + 2 {
                return Err("record does not match the MrmpConstraint layout");
            }
            let node_id = record.ints[cursor] as usize;
            let ndof = record.ints[cursor + 1] as usize;
            if record.ints.len() < cursor + 2 + ndof {
                return Err("record does not match the MrmpConstraint layout");
            }
            let dofs = record.ints[cursor + 2..cursor + 2 + ndof]
                .iter()
                .map(|value| dof_from_i64(*value))
                .collect::<Result<Vec<_>, _>>()?;
            retained.push((node_id, dofs));
            cursor += 2 + ndof;
            nret += ndof;
        }
        if record.ints.len() != cursor || record.doubles.len() != ncon * nret + ncon {
            return Err("record does not match the MrmpConstraint layout");
        }
        self.tag = record.tag;
        self.constrained_node = record.ints[0] as usize;
        self.constrained_dofs = constrained_dofs;
        self.retained = retained;
        let mut cc = Matrix::new(ncon, nret);
        for i in 0..ncon {
            for j in 0..nret {
                cc.set(i, j, record.doubles[i * nret + j]);
            }
        }
        self.cc = cc;
        self.gg = Vector::from(&&record.doubles[ncon * nret..]);
        Ok(())
    }
}

impl SyncState for DofGroup {
    /// Exchanges the equation numbers (−1 encodes an unnumbered/eliminated slot)
    fn to_record(&self) -> SyncRecord {
        SyncRecord {
            tag: self.tag,
            ints: self
                .eqs
                .iter()
                .map(|eq| match eq {
                    Some(i) => *i as i64,
                    None => -1,
                })
                .collect(),
            doubles: self.unbalance.as_data().clone(),
        }
    }

    fn update_from_record(&mut self, record: &SyncRecord) -> Result<(), StrError> {
        if record.ints.len() != self.eqs.len() || record.doubles.len() != self.unbalance.dim() {
            return Err("record does not match the DofGroup layout");
        }
        self.tag = record.tag;
        for (slot, value) in record.ints.iter().enumerate() {
            self.eqs[slot] = if *value < 0 { None } else { Some(*value as usize) };
        }
        for (slot, value) in record.doubles.iter().enumerate() {
            self.unbalance[slot] = *value;
        }
        Ok(())
    }
}

impl SyncState for FeElement {
    /// Exchanges the local-to-global map (−1 encodes an eliminated/unused slot)
    fn to_record(&self) -> SyncRecord {
        SyncRecord {
            tag: self.tag,
            ints: self
                .id
                .iter()
                .map(|eq| match eq {
                    Some(i) => *i as i64,
                    None => -1,
                })
                .collect(),
            doubles: Vec::new(),
        }
    }

    fn update_from_record(&mut self, record: &SyncRecord) -> Result<(), StrError> {
        if record.ints.len() != self.actual.n_local_eq() {
            return Err("record does not match the FeElement layout");
        }
        self.tag = record.tag;
        self.id = record
            .ints
            .iter()
            .map(|value| if *value < 0 { None } else { Some(*value as usize) })
            .collect();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
