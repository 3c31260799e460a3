// This file is part of aukernel, an evaluation engine for hypothesized mappings
// between facial action units and emotion categories.
//
// Copyright (C) 2026, the aukernel developers.
//
// You can redistribute aukernel source codes and/or modify it under the terms
// of the BSD 2-Clause License.
//
// You should have received a copy of the BSD 2-Clause License along with the software.
// If not, see < https://opensource.org/licenses/BSD-2-Clause>.

use std::sync::Arc;

use tracing::debug;

use super::{Kernel, KernelFamily, Normalization, Prediction, BINARIZE_THRESHOLD};
use crate::common::{AuTable, AuVocabulary, EmotionSet};
use crate::error::{Error, Result};
use crate::math;
use crate::model::{MappingConfig, MappingMatrix};

/// Everything about a classifier except its mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierOptions {
    pub kernel: Kernel,
    /// Expected family of `kernel`; checked against the kernel's own family when set.
    pub family: Option<KernelFamily>,
    /// Reduce activations to on/off before scoring.
    pub binarize: bool,
    pub normalization: Normalization,
    pub beta: f64,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        ClassifierOptions {
            kernel: Kernel::Cosine,
            family: None,
            binarize: false,
            normalization: Normalization::Softmax,
            beta: 1.0,
        }
    }
}

impl ClassifierOptions {
    /// Builds options from their textual names, e.g. `("cosine", Some("similarity"), "softmax")`.
    pub fn parse(
        kernel: &str,
        family: Option<&str>,
        normalization: &str,
        beta: f64,
        binarize: bool,
    ) -> Result<Self> {
        let options = ClassifierOptions {
            kernel: kernel.parse()?,
            family: family.map(str::parse).transpose()?,
            binarize,
            normalization: normalization.parse()?,
            beta,
        };
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<KernelFamily> {
        if !(self.beta > 0.0 && self.beta.is_finite()) {
            return Err(Error::IllegalBeta(self.beta));
        }
        let declared = self.kernel.family();
        match self.family {
            Some(requested) if requested != declared => Err(Error::KernelFamilyMismatch {
                kernel: self.kernel.to_string(),
                declared: declared.to_string(),
                requested: requested.to_string(),
            }),
            _ => Ok(declared),
        }
    }
}

/// Turns a hypothesized AU-to-emotion mapping into emotion probabilities.
///
/// Each trial is compared to every emotion's reference pattern with the
/// selected kernel, and the scores are normalized into a distribution.
/// Nothing is learned: [`KernelClassifier::fit`] only resolves the mapping
/// configuration, and [`KernelClassifier::add_mapping`] swaps in another
/// matrix wholesale.
///
/// # Examples
///
/// ```rust
/// use aukernel::{AuTable, ClassifierOptions, EmotionSet, KernelClassifier, MappingMatrix};
///
/// let z = MappingMatrix::from_rows(
///     vec!["happy", "sadness"],
///     vec!["AU6", "AU12", "AU15"],
///     vec![vec![1.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
/// ).unwrap();
///
/// let emotions = EmotionSet::new(vec!["happy", "sadness"]).unwrap();
/// let mut classifier = KernelClassifier::new(None, None, emotions, ClassifierOptions::default()).unwrap();
/// classifier.add_mapping(&z).unwrap();
///
/// let x = AuTable::from_rows(vec!["AU6", "AU12", "AU15"], vec![vec![0.8, 0.9, 0.0]]).unwrap();
/// let prediction = classifier.predict_proba(&x).unwrap();
/// assert_eq!(0, prediction.argmax(0));
/// ```
#[derive(Clone, Debug)]
pub struct KernelClassifier {
    mapping: Option<MappingConfig>,
    vocabulary: Option<AuVocabulary>,
    emotions: EmotionSet,
    kernel: Kernel,
    family: KernelFamily,
    binarize: bool,
    normalization: Normalization,
    beta: f64,
    z: Option<Arc<MappingMatrix>>,
}

impl KernelClassifier {
    /// Creates a classifier.
    ///
    /// `mapping` may be `None` when mappings will only be supplied through
    /// [`KernelClassifier::add_mapping`]. Without a `vocabulary` the AU
    /// columns of the first fitted table or added mapping are used.
    ///
    /// # Errors
    ///
    /// Fails if beta is not positive and finite, or the family tag in
    /// `options` contradicts the kernel.
    pub fn new(
        mapping: Option<MappingConfig>,
        vocabulary: Option<AuVocabulary>,
        emotions: EmotionSet,
        options: ClassifierOptions,
    ) -> Result<Self> {
        let family = options.validate()?;
        Ok(KernelClassifier {
            mapping,
            vocabulary,
            emotions,
            kernel: options.kernel,
            family,
            binarize: options.binarize,
            normalization: options.normalization,
            beta: options.beta,
            z: None,
        })
    }

    /// Resolves the mapping configuration against the AU columns.
    ///
    /// `labels` are only checked for length. Calling this twice yields the
    /// same mapping.
    pub fn fit<S>(&mut self, x: &AuTable, labels: &[S]) -> Result<()> {
        if labels.len() != x.n_rows() {
            return Err(Error::shape(format!(
                "{} labels for {} trials",
                labels.len(),
                x.n_rows()
            )));
        }
        let mapping = self
            .mapping
            .as_ref()
            .ok_or_else(|| Error::invalid("classifier has no mapping configuration to fit"))?;

        let columns: &[String] = match &self.vocabulary {
            Some(vocabulary) => vocabulary.names(),
            None => x.columns(),
        };
        if !x.columns().iter().any(|c| columns.contains(c)) {
            return Err(Error::NoAuOverlap {
                given: x.columns().to_vec(),
            });
        }

        let z = mapping.resolve(columns, &self.emotions)?;
        debug!(emotions = z.emotions().len(), aus = z.aus().len(), "resolved mapping");
        self.z = Some(Arc::new(z));
        Ok(())
    }

    /// Replaces the current mapping with `z`.
    ///
    /// AUs outside the vocabulary are dropped and vocabulary AUs absent from
    /// `z` are zero-filled. Rows are reordered to the emotion set.
    ///
    /// # Errors
    ///
    /// Fails if `z` lacks a row for a predicted emotion or shares no AU with
    /// the vocabulary.
    pub fn add_mapping(&mut self, z: &MappingMatrix) -> Result<()> {
        let z = z.align_rows(&self.emotions)?;
        let z = match &self.vocabulary {
            Some(vocabulary) => {
                if !z.aus().iter().any(|au| vocabulary.contains(au)) {
                    return Err(Error::NoAuOverlap { given: z.aus().to_vec() });
                }
                z.align_columns(vocabulary.names())
            }
            None => z,
        };
        debug!(aus = z.aus().len(), "installed mapping");
        self.z = Some(Arc::new(z));
        Ok(())
    }

    /// The mapping predictions are currently made with.
    pub fn mapping(&self) -> Option<&MappingMatrix> {
        self.z.as_deref()
    }

    /// Probability of each emotion for each row of `x`.
    ///
    /// # Errors
    ///
    /// Fails if no mapping is set, `x` shares no AU column with it, or a
    /// kernel score overflows to a non-finite value.
    pub fn predict_proba(&self, x: &AuTable) -> Result<Prediction> {
        let z = self.z.as_ref().ok_or(Error::NotFitted)?;
        let x = x.align(z.aus())?;

        let n_emotions = self.emotions.len();
        let mut probs = Vec::with_capacity(x.n_rows() * n_emotions);
        let mut trial = vec![0.0; x.n_columns()];
        let mut scores = vec![0.0; n_emotions];

        for (i, row) in x.rows().enumerate() {
            trial.copy_from_slice(row);
            if self.binarize {
                math::binarize(&mut trial, BINARIZE_THRESHOLD);
            }
            for (j, score) in scores.iter_mut().enumerate() {
                *score = self.family.orient(self.kernel.compute(&trial, z.row(j)));
                if !score.is_finite() {
                    return Err(Error::invalid(format!(
                        "{} kernel score of trial {} against emotion {} is not finite",
                        self.kernel,
                        i,
                        self.emotions.names()[j]
                    )));
                }
            }
            self.normalization.apply(&mut scores, self.beta);
            probs.extend_from_slice(&scores);
        }

        Ok(Prediction::new(self.emotions.clone(), probs))
    }

    /// Most probable emotion index per row of `x`.
    pub fn predict(&self, x: &AuTable) -> Result<Vec<usize>> {
        let prediction = self.predict_proba(x)?;
        Ok((0..prediction.n_trials()).map(|i| prediction.argmax(i)).collect())
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn family(&self) -> KernelFamily {
        self.family
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn binarize(&self) -> bool {
        self.binarize
    }

    pub fn emotions(&self) -> &EmotionSet {
        &self.emotions
    }

    pub fn vocabulary(&self) -> Option<&AuVocabulary> {
        self.vocabulary.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn two_emotions() -> EmotionSet {
        EmotionSet::new(vec!["e0", "e1"]).unwrap()
    }

    fn toy_mapping() -> MappingMatrix {
        MappingMatrix::from_rows(
            vec!["e0", "e1"],
            vec!["AU1", "AU2", "AU3"],
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
        )
        .unwrap()
    }

    fn three_emotion_mapping() -> MappingMatrix {
        MappingMatrix::from_rows(
            vec!["anger", "happy", "sadness"],
            vec!["AU4", "AU6", "AU12", "AU15"],
            vec![
                vec![1.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 1.0, 0.0],
                vec![0.5, 0.0, 0.0, 1.0],
            ],
        )
        .unwrap()
    }

    fn trials() -> AuTable {
        AuTable::from_rows(
            vec!["AU4", "AU6", "AU12", "AU15"],
            vec![
                vec![0.9, 0.1, 0.0, 0.2],
                vec![0.0, 0.7, 0.8, 0.0],
                vec![0.3, 0.0, 0.1, 0.9],
                vec![0.0, 0.0, 0.0, 0.0],
                vec![2.0, 1.5, 0.5, 3.0],
            ],
        )
        .unwrap()
    }

    fn classifier(kernel: Kernel, beta: f64, binarize: bool, z: &MappingMatrix) -> KernelClassifier {
        let emotions = EmotionSet::new(z.emotions().to_vec()).unwrap();
        let options = ClassifierOptions {
            kernel,
            beta,
            binarize,
            ..ClassifierOptions::default()
        };
        let mut classifier = KernelClassifier::new(None, None, emotions, options).unwrap();
        classifier.add_mapping(z).unwrap();
        classifier
    }

    #[test]
    fn test_toy_cosine() {
        let clf = classifier(Kernel::Cosine, 1.0, false, &toy_mapping());
        let x = AuTable::from_rows(vec!["AU1", "AU2", "AU3"], vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]])
            .unwrap();

        let prediction = clf.predict_proba(&x).unwrap();
        assert!(prediction.row(0)[0] > prediction.row(0)[1]);
        assert!((prediction.row(1)[0] - 0.5).abs() < TOLERANCE);
        assert!((prediction.row(1)[1] - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_rows_sum_to_one() {
        let z = three_emotion_mapping();
        for &kernel in Kernel::ALL.iter() {
            for &beta in [0.1, 1.0, 10.0, 100.0, 1000.0, 10000.0].iter() {
                for &binarize in [false, true].iter() {
                    let prediction = classifier(kernel, beta, binarize, &z)
                        .predict_proba(&trials())
                        .unwrap();
                    assert_eq!(5, prediction.n_trials());
                    assert_eq!(3, prediction.n_emotions());
                    for row in prediction.rows() {
                        let sum: f64 = row.iter().sum();
                        assert!((sum - 1.0).abs() < TOLERANCE, "{} beta={}: {}", kernel, beta, sum);
                        assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_swap_mapping_has_no_residue() {
        let z1 = three_emotion_mapping();
        let z2 = z1
            .with_values(vec![("anger", "AU4", 0.0), ("anger", "AU15", 1.0), ("happy", "AU6", 0.2)])
            .unwrap();
        let x = trials();

        for &kernel in Kernel::ALL.iter() {
            let direct1 = classifier(kernel, 2.0, false, &z1).predict_proba(&x).unwrap();
            let direct2 = classifier(kernel, 2.0, false, &z2).predict_proba(&x).unwrap();
            assert_ne!(direct1, direct2);

            let mut swapping = classifier(kernel, 2.0, false, &z1);
            swapping.add_mapping(&z2).unwrap();
            assert_eq!(direct2, swapping.predict_proba(&x).unwrap());
            swapping.add_mapping(&z1).unwrap();
            assert_eq!(direct1, swapping.predict_proba(&x).unwrap());
            swapping.add_mapping(&z2).unwrap();
            assert_eq!(direct2, swapping.predict_proba(&x).unwrap());
        }
    }

    #[test]
    fn test_cloned_classifier_keeps_its_mapping() {
        let z1 = three_emotion_mapping();
        let z2 = z1.with_values(vec![("happy", "AU12", 0.0)]).unwrap();
        let original = classifier(Kernel::Linear, 1.0, false, &z1);
        let mut copy = original.clone();
        copy.add_mapping(&z2).unwrap();
        assert_eq!(Some(&z1), original.mapping());
        assert_eq!(Some(&z2), copy.mapping());
    }

    #[test]
    fn test_beta_sharpens_similarity_kernels() {
        let z = three_emotion_mapping();
        let x = trials().select_rows(&[0, 1, 2, 4]);
        for &kernel in [Kernel::Cosine, Kernel::Linear, Kernel::Sigmoid].iter() {
            let mut last: Option<Prediction> = None;
            for &beta in [0.5, 1.0, 2.0, 5.0, 10.0].iter() {
                let prediction = classifier(kernel, beta, false, &z).predict_proba(&x).unwrap();
                if let Some(previous) = &last {
                    for trial in 0..prediction.n_trials() {
                        let top = previous.argmax(trial);
                        assert_eq!(top, prediction.argmax(trial));
                        assert!(
                            prediction.row(trial)[top] > previous.row(trial)[top],
                            "{} trial {} beta {}",
                            kernel,
                            trial,
                            beta
                        );
                    }
                }
                last = Some(prediction);
            }
        }
    }

    #[test]
    fn test_distance_kernels_favour_nearest_pattern() {
        let z = three_emotion_mapping();
        let x = AuTable::from_rows(
            vec!["AU4", "AU6", "AU12", "AU15"],
            vec![
                vec![1.0, 0.0, 0.1, 0.0],
                vec![0.0, 0.9, 1.0, 0.0],
                vec![0.4, 0.0, 0.0, 1.0],
            ],
        )
        .unwrap();

        for &kernel in [Kernel::Euclidean, Kernel::L1, Kernel::L2].iter() {
            let prediction = classifier(kernel, 1.0, false, &z).predict_proba(&x).unwrap();
            assert_eq!(0, prediction.argmax(0), "{}", kernel);
            assert_eq!(1, prediction.argmax(1), "{}", kernel);
            assert_eq!(2, prediction.argmax(2), "{}", kernel);
        }
    }

    #[test]
    fn test_binarize_erases_sub_threshold_differences() {
        let z = three_emotion_mapping();
        let columns = vec!["AU4", "AU6", "AU12", "AU15"];
        let x1 = AuTable::from_rows(columns.clone(), vec![vec![0.9, 0.0, -0.3, 0.4]]).unwrap();
        let x2 = AuTable::from_rows(columns, vec![vec![0.2, -0.5, 0.0, 1.7]]).unwrap();

        for &kernel in Kernel::ALL.iter() {
            let clf = classifier(kernel, 3.0, true, &z);
            assert_eq!(clf.predict_proba(&x1).unwrap(), clf.predict_proba(&x2).unwrap());
        }

        let clf = classifier(Kernel::Linear, 3.0, false, &z);
        assert_ne!(clf.predict_proba(&x1).unwrap(), clf.predict_proba(&x2).unwrap());
    }

    #[test]
    fn test_fit_resolves_mapping_against_vocabulary() {
        let vocabulary = AuVocabulary::new(vec!["AU1", "AU2", "AU3"]).unwrap();
        let mut clf = KernelClassifier::new(
            Some(MappingConfig::from(toy_mapping())),
            Some(vocabulary),
            two_emotions(),
            ClassifierOptions::default(),
        )
        .unwrap();

        assert!(matches!(clf.predict_proba(&trials()), Err(Error::NotFitted)));

        // input columns in another order, with one extra and one missing
        let x = AuTable::from_rows(vec!["AU2", "AU7", "AU1"], vec![vec![0.0, 5.0, 1.0]]).unwrap();
        clf.fit(&x, &["e0"]).unwrap();
        let first = clf.mapping().cloned();
        clf.fit(&x, &["e0"]).unwrap();
        assert_eq!(first.as_ref(), clf.mapping());
        assert_eq!(names(&["AU1", "AU2", "AU3"]), clf.mapping().unwrap().aus());

        let prediction = clf.predict_proba(&x).unwrap();
        assert_eq!(0, prediction.argmax(0));
    }

    #[test]
    fn test_fit_failures() {
        let vocabulary = AuVocabulary::new(vec!["AU1", "AU2", "AU3"]).unwrap();
        let mut clf = KernelClassifier::new(
            Some(MappingConfig::from(toy_mapping())),
            Some(vocabulary),
            two_emotions(),
            ClassifierOptions::default(),
        )
        .unwrap();

        let unrelated = AuTable::from_rows(vec!["AU9"], vec![vec![1.0]]).unwrap();
        assert!(matches!(clf.fit(&unrelated, &["e0"]), Err(Error::NoAuOverlap { .. })));

        let x = AuTable::from_rows(vec!["AU1"], vec![vec![1.0]]).unwrap();
        assert!(matches!(clf.fit(&x, &["e0", "e1"]), Err(Error::Shape(_))));

        let mut unconfigured =
            KernelClassifier::new(None, None, two_emotions(), ClassifierOptions::default()).unwrap();
        assert!(unconfigured.fit(&x, &["e0"]).is_err());
    }

    #[test]
    fn test_add_mapping_aligns_to_vocabulary() {
        let vocabulary = AuVocabulary::new(vec!["AU1", "AU2", "AU3", "AU4"]).unwrap();
        let mut clf = KernelClassifier::new(None, Some(vocabulary), two_emotions(), ClassifierOptions::default())
            .unwrap();

        // rows out of order, an extra emotion, an AU outside the vocabulary
        let z = MappingMatrix::from_rows(
            vec!["e1", "neutral", "e0"],
            vec!["AU2", "AU99", "AU1"],
            vec![vec![1.0, 1.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 1.0, 1.0]],
        )
        .unwrap();
        clf.add_mapping(&z).unwrap();

        let z = clf.mapping().unwrap();
        assert_eq!(names(&["e0", "e1"]), z.emotions());
        assert_eq!(names(&["AU1", "AU2", "AU3", "AU4"]), z.aus());
        assert_eq!(&[1.0, 0.0, 0.0, 0.0], z.row(0));
        assert_eq!(&[0.0, 1.0, 0.0, 0.0], z.row(1));

        let missing_row = MappingMatrix::from_rows(vec!["e0"], vec!["AU1"], vec![vec![1.0]]).unwrap();
        assert!(matches!(clf.add_mapping(&missing_row), Err(Error::MissingEmotion(_))));
    }

    #[test]
    fn test_add_mapping_without_overlap_fails() {
        let vocabulary = AuVocabulary::new(vec!["AU1", "AU2"]).unwrap();
        let mut clf = KernelClassifier::new(None, Some(vocabulary), two_emotions(), ClassifierOptions::default())
            .unwrap();
        clf.add_mapping(&toy_mapping()).unwrap();

        let foreign = MappingMatrix::from_rows(
            vec!["e0", "e1"],
            vec!["AU98", "AU99"],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
        assert!(matches!(clf.add_mapping(&foreign), Err(Error::NoAuOverlap { .. })));
        // the previous mapping stays installed
        assert_eq!(&[1.0, 0.0], clf.mapping().unwrap().row(0));
    }

    #[test]
    fn test_overflowing_kernel_score_fails() {
        let z = MappingMatrix::from_rows(
            vec!["e0", "e1"],
            vec!["AU1", "AU2"],
            vec![vec![1.0, 1.0], vec![0.0, 1.0]],
        )
        .unwrap();
        let x = AuTable::from_rows(vec!["AU1", "AU2"], vec![vec![1e308, 1e308]]).unwrap();
        for kernel in [Kernel::Linear, Kernel::Cosine, Kernel::Euclidean] {
            let clf = classifier(kernel, 1.0, false, &z);
            assert!(matches!(clf.predict_proba(&x), Err(Error::InvalidValue(_))), "{}", kernel);
        }

        // large but representable scores still normalize
        let x = AuTable::from_rows(vec!["AU1", "AU2"], vec![vec![1e150, 1e150]]).unwrap();
        let prediction = classifier(Kernel::Linear, 1.0, false, &z).predict_proba(&x).unwrap();
        let sum: f64 = prediction.row(0).iter().sum();
        assert!((sum - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_predict_without_overlap_fails() {
        let clf = classifier(Kernel::Cosine, 1.0, false, &toy_mapping());
        let x = AuTable::from_rows(vec!["AU9"], vec![vec![1.0]]).unwrap();
        assert!(matches!(clf.predict_proba(&x), Err(Error::NoAuOverlap { .. })));
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            ClassifierOptions::parse("rbf", None, "softmax", 1.0, false),
            Err(Error::UnknownKernel(_))
        ));
        assert!(matches!(
            ClassifierOptions::parse("cosine", None, "sparsemax", 1.0, false),
            Err(Error::UnknownNormalization(_))
        ));
        assert!(matches!(
            ClassifierOptions::parse("l1", Some("similarity"), "softmax", 1.0, false),
            Err(Error::KernelFamilyMismatch { .. })
        ));
        assert!(matches!(
            ClassifierOptions::parse("cosine", None, "softmax", 0.0, false),
            Err(Error::IllegalBeta(_))
        ));

        let options = ClassifierOptions::parse("euclidean", Some("distance"), "softmax", 10.0, true).unwrap();
        assert_eq!(Kernel::Euclidean, options.kernel);
        assert!(options.binarize);
    }
}
