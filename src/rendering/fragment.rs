/// Per-pixel fragment records and the depth-sorted list that holds them.
use crate::meshing::TriangleId;
use glam::{Vec2, Vec3};

/// Surface sample produced by the rasterizer for one pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fragment {
    /// Perspective-corrected barycentric weights, summing to one.
    pub weights: Vec3,
    /// Interpolated texture coordinate.
    pub uv: Vec2,
    /// NDC depth, smaller is nearer.
    pub depth: f32,
    /// Coverage in [0, 1]. 1 means fully opaque.
    pub opacity: f32,
    pub triangle: TriangleId,
}

impl Fragment {
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.opacity >= 1.0
    }
}

const FRAGMENT_LIST_CAPACITY: usize = 4;

/// Fragments covering one pixel, nearest first.
///
/// Nothing is ever kept behind an opaque fragment: inserting an opaque
/// fragment discards everything farther away, and fragments behind an
/// existing opaque one are rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentList {
    fragments: Vec<Fragment>,
}

impl Default for FragmentList {
    fn default() -> Self {
        Self {
            fragments: Vec::with_capacity(FRAGMENT_LIST_CAPACITY),
        }
    }
}

impl FragmentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert in depth order. Returns false when the fragment is hidden
    /// behind an opaque one. Ties keep the earlier fragment in front.
    pub fn insert(&mut self, fragment: Fragment) -> bool {
        let mut index = self.fragments.len();
        for (i, existing) in self.fragments.iter().enumerate() {
            if existing.depth <= fragment.depth {
                if existing.is_opaque() {
                    return false;
                }
            } else {
                index = i;
                break;
            }
        }

        self.fragments.insert(index, fragment);
        if fragment.is_opaque() {
            self.fragments.truncate(index + 1);
        }
        true
    }

    /// Drop every fragment, keeping the allocation for the next frame.
    #[inline]
    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Fragment] {
        &self.fragments
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Fragment> {
        self.fragments.iter()
    }

    #[inline]
    pub fn nearest(&self) -> Option<&Fragment> {
        self.fragments.first()
    }
}

impl<'a> IntoIterator for &'a FragmentList {
    type Item = &'a Fragment;
    type IntoIter = std::slice::Iter<'a, Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.fragments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(depth: f32, opacity: f32, id: u32) -> Fragment {
        Fragment {
            weights: Vec3::new(1.0, 0.0, 0.0),
            uv: Vec2::ZERO,
            depth,
            opacity,
            triangle: TriangleId(id),
        }
    }

    fn ids(list: &FragmentList) -> Vec<u32> {
        list.iter().map(|f| f.triangle.0).collect()
    }

    #[test]
    fn keeps_nearest_first() {
        let mut list = FragmentList::new();
        assert!(list.insert(frag(0.5, 0.5, 0)));
        assert!(list.insert(frag(0.1, 0.5, 1)));
        assert!(list.insert(frag(0.3, 0.5, 2)));
        assert_eq!(ids(&list), vec![1, 2, 0]);
    }

    #[test]
    fn opaque_truncates_farther_fragments() {
        let mut list = FragmentList::new();
        list.insert(frag(0.2, 0.5, 0));
        list.insert(frag(0.6, 0.5, 1));
        list.insert(frag(0.8, 1.0, 2));
        assert!(list.insert(frag(0.4, 1.0, 3)));
        assert_eq!(ids(&list), vec![0, 3]);
    }

    #[test]
    fn rejects_fragments_behind_opaque() {
        let mut list = FragmentList::new();
        list.insert(frag(0.3, 1.0, 0));
        assert!(!list.insert(frag(0.7, 0.5, 1)));
        assert!(!list.insert(frag(0.7, 1.0, 2)));
        // Equal depth loses against an opaque fragment
        assert!(!list.insert(frag(0.3, 0.5, 3)));
        assert_eq!(ids(&list), vec![0]);
    }

    #[test]
    fn equal_depth_goes_after_existing_transparent() {
        let mut list = FragmentList::new();
        list.insert(frag(0.5, 0.5, 0));
        list.insert(frag(0.5, 0.5, 1));
        assert_eq!(ids(&list), vec![0, 1]);
    }

    #[test]
    fn transparent_in_front_of_opaque_is_kept() {
        let mut list = FragmentList::new();
        list.insert(frag(0.5, 1.0, 0));
        assert!(list.insert(frag(0.2, 0.4, 1)));
        assert_eq!(ids(&list), vec![1, 0]);
        assert!(list.as_slice().last().unwrap().is_opaque());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut list = FragmentList::new();
        for i in 0..10 {
            list.insert(frag(i as f32 * 0.05, 0.1, i));
        }
        list.clear();
        assert!(list.is_empty());
        assert!(list.fragments.capacity() >= 10);
    }
}
