use crate::debug_collision;
use crate::geometry::{Shape, SimObject};
use crate::types::Location;

/// Outcome of touching one object
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    /// The mover may keep going along this direction
    Slide(Location),
    Stop,
}

/// How several simultaneous contacts combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactPolicy {
    /// Contacts scale the force one after another in board order
    #[default]
    Sequential,
    /// Only the most restrictive contact applies
    Minimum,
}

/// Returns a contact for each object whose placed collision overlaps `moved`
pub fn find_contacts<'a, T, I>(moved: &Shape, objects: I) -> Vec<Contact>
where
    T: SimObject + 'a,
    I: IntoIterator<Item = &'a T>,
{
    objects
        .into_iter()
        .filter(|obj| moved.overlaps(&obj.transformed_collision()))
        .map(|obj| {
            let contact = match obj.hit_direction() {
                Some(dir) => Contact::Slide(dir),
                None => Contact::Stop,
            };
            debug_collision!("Contact at {} -> {:?}", obj.location(), contact);
            contact
        })
        .collect()
}

/// Applies contacts to a forward force for a mover facing `heading`
pub fn resolve_force(force: f64, heading: f64, contacts: &[Contact], policy: ContactPolicy) -> f64 {
    match policy {
        ContactPolicy::Sequential => {
            let mut force = force;
            for contact in contacts {
                match contact {
                    Contact::Stop => return 0.0,
                    Contact::Slide(dir) => force *= (heading - dir.theta).cos(),
                }
            }
            force
        }
        ContactPolicy::Minimum => {
            let mut factor: f64 = 1.0;
            for contact in contacts {
                match contact {
                    Contact::Stop => return 0.0,
                    Contact::Slide(dir) => {
                        let f = (heading - dir.theta).cos();
                        if f.abs() < factor.abs() {
                            factor = f;
                        }
                    }
                }
            }
            force * factor
        }
    }
}
