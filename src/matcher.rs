use crate::plugin::Distance;
use crate::template::Template;

/// Scores of `probe` against every gallery template, best first.
pub fn rank<'a>(
    distance: &dyn Distance,
    gallery: &'a [Template],
    probe: &Template,
) -> Vec<(&'a Template, f32)> {
    let mut scores: Vec<_> = gallery
        .iter()
        .map(|target| (target, distance.compare(target, probe)))
        .collect();
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores
}

pub fn best_score(distance: &dyn Distance, gallery: &[Template], probe: &Template) -> Option<f32> {
    rank(distance, gallery, probe).first().map(|(_, score)| *score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{FileMeta, Mat};

    struct FirstByte;

    impl Distance for FirstByte {
        fn name(&self) -> &'static str {
            "FirstByte"
        }

        fn compare(&self, target: &Template, _query: &Template) -> f32 {
            target.m.data.first().map_or(f32::MIN, |b| *b as f32)
        }
    }

    fn templ(name: &str, bytes: &[u8]) -> Template {
        Template::new(FileMeta::new(name), Mat::from_bytes(bytes.to_vec()))
    }

    #[test]
    fn test_rank_orders_best_first() {
        let gallery = vec![templ("a", &[3]), templ("b", &[9]), templ("c", &[])];
        let probe = templ("p", &[1]);
        let ranked = rank(&FirstByte, &gallery, &probe);
        let names: Vec<_> = ranked.iter().map(|(t, _)| t.file.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(best_score(&FirstByte, &gallery, &probe), Some(9.0));
    }

    #[test]
    fn test_empty_gallery() {
        assert_eq!(best_score(&FirstByte, &[], &templ("p", &[1])), None);
    }
}
