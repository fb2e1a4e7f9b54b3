// Three-dimensional vector helpers
// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Vector arithmetic is nalgebra's: `+`, `-`, scalar `*`, [`dot`](na::Vector3::dot),
//! [`cross`](na::Vector3::cross) and [`norm`](na::Vector3::norm) all act on [`Vector3`] by value
//! without side effects. NaN and infinities propagate unchanged.

use nalgebra as na;

/// A real-valued 3D vector. World frame unless stated otherwise, with +y pointing up.
pub type Vector3 = na::Vector3<f64>;

/// Euclidean distance between two points.
pub fn distance(a: &Vector3, b: &Vector3) -> f64 {
    (a - b).norm()
}

/// Whether every component is finite.
pub fn is_finite(v: &Vector3) -> bool {
    v.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_norm_of_difference() {
        let a = Vector3::new(1.0, 2.0, 2.0);
        assert_eq!(distance(&a, &Vector3::zeros()), 3.0);
        assert_eq!(distance(&a, &a), 0.0);
    }

    #[test]
    fn test_non_finite_components_are_detected() {
        assert!(is_finite(&Vector3::new(1.0, -2.0, 0.0)));
        assert!(!is_finite(&Vector3::new(f64::NAN, 0.0, 0.0)));
        assert!(!is_finite(&Vector3::new(0.0, f64::INFINITY, 0.0)));
    }
}
