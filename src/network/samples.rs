use ndarray::{Array2, ArrayView1, ArrayView2};

use super::Topology;
use crate::error::ConfigErr;

/// A supervised dataset, one sample per row.
#[derive(Debug, Clone)]
pub struct Samples {
    inputs: Array2<f32>,
    targets: Array2<f32>,
}

impl Samples {
    /// Creates a new `Samples` from two row-aligned matrices.
    ///
    /// # Arguments
    /// * `inputs` - One feature vector per row.
    /// * `targets` - One target vector per row.
    ///
    /// # Returns
    /// An error if the amount of rows differ.
    pub fn new(inputs: Array2<f32>, targets: Array2<f32>) -> Result<Self, ConfigErr> {
        if inputs.nrows() != targets.nrows() {
            return Err(ConfigErr::SampleCountMismatch {
                inputs: inputs.nrows(),
                targets: targets.nrows(),
            });
        }

        Ok(Self { inputs, targets })
    }

    /// Copies two borrowed, row-aligned matrices into a new `Samples`.
    pub fn from_views(inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<Self, ConfigErr> {
        if inputs.nrows() != targets.nrows() {
            return Err(ConfigErr::SampleCountMismatch {
                inputs: inputs.nrows(),
                targets: targets.nrows(),
            });
        }

        Ok(Self {
            inputs: inputs.to_owned(),
            targets: targets.to_owned(),
        })
    }

    /// Builds a `Samples` from sequences of equally sized vectors.
    ///
    /// # Returns
    /// An error if the sequences differ in length or a vector has a different width
    /// than the first one of its sequence.
    pub fn from_rows<I, T>(inputs: &[I], targets: &[T]) -> Result<Self, ConfigErr>
    where
        I: AsRef<[f32]>,
        T: AsRef<[f32]>,
    {
        if inputs.len() != targets.len() {
            return Err(ConfigErr::SampleCountMismatch {
                inputs: inputs.len(),
                targets: targets.len(),
            });
        }

        let inputs = stack_rows("input", inputs)?;
        let targets = stack_rows("target", targets)?;
        Ok(Self { inputs, targets })
    }

    /// Validates the widths of the samples against the input and output layers.
    pub fn check_widths(&self, topology: &Topology) -> Result<(), ConfigErr> {
        // An empty dataset carries no widths to check.
        if self.is_empty() {
            return Ok(());
        }

        if self.inputs.ncols() != topology.input_width() {
            return Err(ConfigErr::WidthMismatch {
                what: "input",
                got: self.inputs.ncols(),
                expected: topology.input_width(),
            });
        }

        if self.targets.ncols() != topology.output_width() {
            return Err(ConfigErr::WidthMismatch {
                what: "target",
                got: self.targets.ncols(),
                expected: topology.output_width(),
            });
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn input(&self, index: usize) -> ArrayView1<'_, f32> {
        self.inputs.row(index)
    }

    pub fn target(&self, index: usize) -> ArrayView1<'_, f32> {
        self.targets.row(index)
    }

    pub fn inputs(&self) -> ArrayView2<'_, f32> {
        self.inputs.view()
    }

    pub fn targets(&self) -> ArrayView2<'_, f32> {
        self.targets.view()
    }
}

fn stack_rows<R: AsRef<[f32]>>(what: &'static str, rows: &[R]) -> Result<Array2<f32>, ConfigErr> {
    let width = rows.first().map_or(0, |row| row.as_ref().len());
    let mut data = Vec::with_capacity(rows.len() * width);

    for row in rows {
        let row = row.as_ref();
        if row.len() != width {
            return Err(ConfigErr::WidthMismatch {
                what,
                got: row.len(),
                expected: width,
            });
        }
        data.extend_from_slice(row);
    }

    let len = data.len();
    Array2::from_shape_vec((rows.len(), width), data).map_err(|_| ConfigErr::WidthMismatch {
        what,
        got: len,
        expected: rows.len() * width,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn mismatched_counts_are_rejected() {
        let err = Samples::new(array![[0., 1.], [1., 0.]], array![[1.]]).unwrap_err();
        assert_eq!(
            err,
            ConfigErr::SampleCountMismatch {
                inputs: 2,
                targets: 1
            }
        );
    }

    #[test]
    fn rows_are_stacked_in_order() {
        let inputs = vec![vec![0., 1.], vec![2., 3.], vec![4., 5.]];
        let targets = vec![vec![1.], vec![0.], vec![1.]];
        let samples = Samples::from_rows(&inputs, &targets).unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples.input(1), array![2., 3.]);
        assert_eq!(samples.target(2), array![1.]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let inputs = vec![vec![0., 1.], vec![2.]];
        let targets = vec![vec![1.], vec![0.]];

        assert_eq!(
            Samples::from_rows(&inputs, &targets).unwrap_err(),
            ConfigErr::WidthMismatch {
                what: "input",
                got: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn widths_are_checked_against_the_topology() {
        let topology = Topology::new([2, 3, 1]).unwrap();
        let samples = Samples::new(array![[0., 1., 2.]], array![[1.]]).unwrap();

        assert_eq!(
            samples.check_widths(&topology).unwrap_err(),
            ConfigErr::WidthMismatch {
                what: "input",
                got: 3,
                expected: 2
            }
        );
    }
}
