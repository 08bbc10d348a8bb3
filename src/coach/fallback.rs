//! Canned replies used when the assistant backend is unreachable or a
//! run ends abnormally. Pure string matching, no I/O, safe to call from
//! anywhere.

const VISA_REPLY: &str =
    "Para obtener información sobre visados, necesito saber a qué país europeo planeas migrar. \
     Cada país tiene requisitos específicos. ¿Podrías indicarme el país de destino?";

const SPAIN_REPLY: &str =
    "Para migrar a España, generalmente necesitarás:\n\n\
     1. Pasaporte vigente\n\
     2. Visado según tu propósito (trabajo, estudios, etc.)\n\
     3. Seguro médico\n\
     4. Prueba de solvencia económica\n\
     5. Antecedentes penales apostillados\n\n\
     ¿Tienes alguna pregunta específica sobre alguno de estos requisitos?";

const WORK_REPLY: &str =
    "Para migrar por motivos laborales, generalmente necesitarás:\n\n\
     1. Una oferta de trabajo de una empresa en el país de destino\n\
     2. Que la empresa solicite un permiso de trabajo para ti\n\
     3. Homologación de tus títulos académicos\n\n\
     ¿Ya cuentas con una oferta laboral o estás en la fase de búsqueda?";

const STUDY_REPLY: &str =
    "Para migrar por estudios, necesitarás:\n\n\
     1. Carta de aceptación de la institución educativa\n\
     2. Seguro médico internacional\n\
     3. Prueba de solvencia económica para mantenerte durante tus estudios\n\
     4. Visado de estudiante\n\n\
     ¿Ya has sido aceptado en alguna institución?";

const DOCUMENTS_REPLY: &str =
    "La documentación exacta depende del país de destino y del motivo de tu migración, pero casi \
     siempre necesitarás pasaporte vigente, antecedentes penales apostillados y certificados \
     traducidos oficialmente. ¿A qué país planeas migrar y con qué propósito?";

const GENERIC_REPLY: &str =
    "Gracias por tu mensaje. Para poder ayudarte mejor, ¿podrías darme más detalles sobre tu \
     situación? Por ejemplo:\n\n\
     - ¿A qué país europeo planeas migrar?\n\
     - ¿Cuál es tu motivo principal (trabajo, estudios, reunificación familiar)?\n\
     - ¿En qué etapa del proceso te encuentras?";

/// Ordered trigger rules, evaluated top to bottom; the first match wins.
const RULES: &[(&[&str], &str)] = &[
    (&["visa", "visado"], VISA_REPLY),
    (&["españa", "spain"], SPAIN_REPLY),
    (&["trabajo", "empleo"], WORK_REPLY),
    (&["estudios", "universidad"], STUDY_REPLY),
    (&["documento"], DOCUMENTS_REPLY),
];

/// Maps a user message to a canned reply, case-insensitively. Falls
/// through to a generic clarifying question when no rule matches.
pub fn fallback_response(message: &str) -> &'static str {
    let normalized = message.to_lowercase();
    for (triggers, reply) in RULES {
        if triggers.iter().any(|trigger| normalized.contains(trigger)) {
            return reply;
        }
    }
    GENERIC_REPLY
}
